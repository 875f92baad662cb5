//! Relevance scoring of a paper's references.
//!
//! `score = cite_count × cosine(root, reference) × influence`, where
//! `influence` is 1.0 for influential citations and 0.5 otherwise.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embed::{EmbedError, Embedder, cosine_similarity};
use crate::scholar::types::{Intent, Paper, Reference};

const INFLUENTIAL_WEIGHT: f32 = 1.0;
const NON_INFLUENTIAL_WEIGHT: f32 = 0.5;

/// Node colour keyed on the first citation intent.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntentColor {
    Red,
    Blue,
    Green,
    Gray,
}

impl IntentColor {
    pub fn from_intents(intents: &[Intent]) -> Self {
        match intents.first() {
            Some(Intent::Methodology) => IntentColor::Red,
            Some(Intent::Background) => IntentColor::Blue,
            Some(Intent::Result) => IntentColor::Green,
            Some(Intent::Other) | None => IntentColor::Gray,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IntentColor::Red => "red",
            IntentColor::Blue => "blue",
            IntentColor::Green => "green",
            IntentColor::Gray => "gray",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoredReference {
    pub paper: Paper,
    pub score: f32,
    pub cite_count: usize,
    pub similarity: f32,
    pub is_influential: bool,
    pub intent: IntentColor,
}

/// Number of in-text mentions, at least 1 (the API sometimes returns no contexts).
pub fn cite_count(reference: &Reference) -> usize {
    reference.contexts.len().max(1)
}

pub fn relevance(cite_count: usize, similarity: f32, is_influential: bool) -> f32 {
    let influence = if is_influential {
        INFLUENTIAL_WEIGHT
    } else {
        NON_INFLUENTIAL_WEIGHT
    };
    cite_count as f32 * similarity * influence
}

/// Score every reference against the root paper and sort by score, highest first.
pub async fn score_references(
    embedder: &impl Embedder,
    root: &Paper,
    references: Vec<Reference>,
) -> Result<Vec<ScoredReference>, EmbedError> {
    if references.is_empty() {
        return Ok(Vec::new());
    }

    let texts: Vec<String> = std::iter::once(root.embedding_text())
        .chain(references.iter().map(|r| r.cited_paper.embedding_text()))
        .map(String::from)
        .collect();
    let embeddings = embedder.embed(&texts).await?;
    let Some((root_vec, ref_vecs)) = embeddings.split_first() else {
        return Err(EmbedError::CountMismatch {
            expected: texts.len(),
            got: 0,
        });
    };
    if ref_vecs.len() != references.len() {
        return Err(EmbedError::CountMismatch {
            expected: texts.len(),
            got: embeddings.len(),
        });
    }

    let mut scored: Vec<_> = references
        .into_iter()
        .zip(ref_vecs)
        .map(|(reference, vec)| {
            let cite_count = cite_count(&reference);
            let similarity = cosine_similarity(root_vec, vec);
            let score = relevance(cite_count, similarity, reference.is_influential);
            debug!(
                title = %reference.cited_paper.title,
                cite_count,
                similarity,
                score,
                "reference scored"
            );
            ScoredReference {
                intent: IntentColor::from_intents(&reference.intents),
                is_influential: reference.is_influential,
                paper: reference.cited_paper,
                score,
                cite_count,
                similarity,
            }
        })
        .collect();

    sort_by_score(&mut scored);
    Ok(scored)
}

/// Stable descending sort; NaN scores sink to the end.
pub fn sort_by_score(scored: &mut [ScoredReference]) {
    scored.sort_by(|a, b| match (a.score.is_nan(), b.score.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => b.score.total_cmp(&a.score),
    });
}
