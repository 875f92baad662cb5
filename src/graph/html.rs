use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{ForceAtlas2, Graph};
use crate::store::{StoreError, file_stem};

const VIS_NETWORK_JS: &str =
    "https://unpkg.com/vis-network@9.1.9/standalone/umd/vis-network.min.js";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Options<'a> {
    physics: Physics<'a>,
    nodes: NodeOptions<'a>,
    interaction: Interaction,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Physics<'a> {
    enabled: bool,
    solver: &'static str,
    force_atlas2_based: &'a ForceAtlas2,
}

#[derive(Serialize)]
struct NodeOptions<'a> {
    font: Font<'a>,
}

#[derive(Serialize)]
struct Font<'a> {
    color: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Interaction {
    hover: bool,
    tooltip_delay: u32,
}

pub fn graph_html_path(dir: &Path, paper_id: &str) -> PathBuf {
    dir.join(format!("{}_referenceGraph.html", file_stem(paper_id)))
}

/// Escape text for an HTML element body or attribute value.
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serialize to JSON that is safe to inline in a `<script>` element.
///
/// `<`, `>` and `&` only occur inside JSON strings, where `\u` escapes are equivalent.
fn script_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(serde_json::to_string(value)?
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026"))
}

/// Render a standalone page that draws `graph` with vis-network.
pub fn render_html(graph: &Graph) -> Result<String, serde_json::Error> {
    let options = Options {
        physics: Physics {
            enabled: true,
            solver: "forceAtlas2Based",
            force_atlas2_based: &graph.physics,
        },
        nodes: NodeOptions {
            font: Font {
                color: graph.style.font_color,
            },
        },
        interaction: Interaction {
            hover: true,
            tooltip_delay: 200,
        },
    };

    let nodes = script_json(&graph.nodes)?;
    let edges = script_json(&graph.edges)?;
    let options = script_json(&options)?;
    let title = escape_html(&graph.title);
    let style = &graph.style;

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{VIS_NETWORK_JS}"></script>
<style>
  body {{ margin: 0; background-color: {background}; }}
  #references {{ width: {width}; height: {height}; background-color: {background}; }}
  div.vis-tooltip {{ white-space: pre-line; }}
</style>
</head>
<body>
<div id="references"></div>
<script>
  const nodes = new vis.DataSet({nodes});
  const edges = new vis.DataSet({edges});
  const container = document.getElementById("references");
  const network = new vis.Network(container, {{ nodes: nodes, edges: edges }}, {options});
</script>
</body>
</html>
"#,
        background = style.background,
        width = style.width,
        height = style.height,
    ))
}

/// Write the rendered graph to `<dir>/<paperId>_referenceGraph.html`.
pub fn write_html(dir: &Path, paper_id: &str, graph: &Graph) -> Result<PathBuf, StoreError> {
    let path = graph_html_path(dir, paper_id);
    let html = render_html(graph).map_err(|source| StoreError::Json {
        path: path.clone(),
        source,
    })?;
    fs::create_dir_all(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    fs::write(&path, html).map_err(|source| StoreError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
