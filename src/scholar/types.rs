use serde::{Deserialize, Deserializer, Serialize};

/// The Graph API sends `null` for empty lists and missing titles; treat it as the default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Paper metadata as returned by the Graph API `paper` endpoints.
///
/// `paper_id` is `None` for references Semantic Scholar could not resolve.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    pub paper_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub authors: Vec<Author>,
    pub year: Option<u16>,
    #[serde(rename = "abstract")]
    pub abstract_: Option<String>,
}

impl Paper {
    /// Text fed to the embedder: the abstract, or the title when there is none.
    pub fn embedding_text(&self) -> &str {
        self.abstract_
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(&self.title)
    }

    pub fn author_names(&self) -> String {
        self.authors
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub author_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// Citation intent classified by Semantic Scholar. `Other` captures new labels via `#[serde(other)]`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Methodology,
    Background,
    Result,
    #[serde(other)]
    Other,
}

/// One edge of the root paper's reference list.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    #[serde(default, deserialize_with = "null_as_default")]
    pub contexts: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub intents: Vec<Intent>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_influential: bool,
    pub cited_paper: Paper,
}

/// Response from `GET /paper/search`.
#[derive(Deserialize, Debug)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<Paper>,
}

/// One page of `GET /paper/{id}/references`.
#[derive(Deserialize, Debug)]
pub struct ReferencesPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<Reference>,
    pub next: Option<usize>,
}
