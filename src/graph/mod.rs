//! Citation graph model and its vis-network HTML rendering.

mod html;

pub use html::write_html;

use std::collections::HashSet;

use serde::Serialize;
use tracing::warn;

use crate::scholar::types::Paper;
use crate::score::ScoredReference;

const ROOT_COLOR: &str = "yellow";
const ROOT_FALLBACK_ID: &str = "root";

/// A vis-network node. `title` is the hover tooltip.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub title: String,
    pub color: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f32>,
    pub shape: &'static str,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

/// ForceAtlas2 parameters, serialized under `physics.forceAtlas2Based`.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForceAtlas2 {
    pub gravitational_constant: f32,
    pub central_gravity: f32,
    pub spring_length: f32,
    pub spring_constant: f32,
    pub damping: f32,
    pub avoid_overlap: f32,
}

impl Default for ForceAtlas2 {
    fn default() -> Self {
        Self {
            gravitational_constant: -5.0,
            central_gravity: 0.001,
            spring_length: 200.0,
            spring_constant: 0.001,
            damping: 0.4,
            avoid_overlap: 0.0,
        }
    }
}

/// Canvas and theme settings for the rendered page.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub height: &'static str,
    pub width: &'static str,
    pub background: &'static str,
    pub font_color: &'static str,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            height: "900px",
            width: "100%",
            background: "#222222",
            font_color: "white",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    pub title: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub physics: ForceAtlas2,
    pub style: Style,
}

/// Star graph: the root paper in the centre, one edge to each scored reference.
///
/// Nodes are keyed by paper id; repeated ids are drawn once.
pub fn build_graph(root: &Paper, scored: &[ScoredReference]) -> Graph {
    let root_id = root
        .paper_id
        .clone()
        .unwrap_or_else(|| ROOT_FALLBACK_ID.to_string());

    let mut nodes = vec![Node {
        id: root_id.clone(),
        label: root.title.clone(),
        title: root_tooltip(root),
        color: ROOT_COLOR,
        value: None,
        shape: "dot",
    }];
    let mut edges = Vec::with_capacity(scored.len());
    let mut seen = HashSet::from([root_id.clone()]);

    for reference in scored {
        let Some(id) = reference.paper.paper_id.clone() else {
            warn!(title = %reference.paper.title, "skipping reference without a paper id");
            continue;
        };
        if !seen.insert(id.clone()) {
            warn!(%id, "duplicate reference in graph, drawing once");
            continue;
        }
        nodes.push(Node {
            id: id.clone(),
            label: reference.paper.title.clone(),
            title: reference_tooltip(reference),
            color: reference.intent.as_str(),
            value: Some(node_value(reference.score)),
            shape: "dot",
        });
        edges.push(Edge {
            from: root_id.clone(),
            to: id,
        });
    }

    Graph {
        title: root.title.clone(),
        nodes,
        edges,
        physics: ForceAtlas2::default(),
        style: Style::default(),
    }
}

/// Node size: score scaled by 100, floored at zero since vis-network cannot size negative values.
fn node_value(score: f32) -> f32 {
    let value = score * 100.0;
    if value.is_nan() { 0.0 } else { value.max(0.0) }
}

fn year_text(paper: &Paper) -> String {
    paper
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "n.d.".to_string())
}

fn root_tooltip(root: &Paper) -> String {
    let mut tip = format!("{} ({})", root.title, year_text(root));
    if !root.authors.is_empty() {
        tip.push('\n');
        tip.push_str(&root.author_names());
    }
    tip
}

fn reference_tooltip(r: &ScoredReference) -> String {
    let mut tip = format!("{} ({})", r.paper.title, year_text(&r.paper));
    if !r.paper.authors.is_empty() {
        tip.push('\n');
        tip.push_str(&r.paper.author_names());
    }
    tip.push_str(&format!(
        "\nscore: {:.3}\ncitations in text: {}\nsimilarity: {:.3}",
        r.score, r.cite_count, r.similarity
    ));
    if r.is_influential {
        tip.push_str("\ninfluential");
    }
    tip
}
