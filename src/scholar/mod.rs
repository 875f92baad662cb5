pub mod types;

use std::env;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::retry::{MAX_ATTEMPTS, is_transient_status, jittered_backoff};
use types::*;

const API_BASE: &str = "https://api.semanticscholar.org/graph/v1";
const SEARCH_FIELDS: &str = "title,authors,year,abstract";
const REFERENCE_FIELDS: &str = "title,authors,year,contexts,intents,isInfluential,abstract";
/// Largest page the references endpoint accepts.
const PAGE_LIMIT: usize = 1000;

/// Errors returned by Semantic Scholar Graph API operations.
#[derive(Debug, thiserror::Error)]
pub enum ScholarError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(
        "Rate limited by the Semantic Scholar API. Wait a moment before trying again, or set SEMANTIC_SCHOLAR_API_KEY."
    )]
    RateLimited,

    #[error("Semantic Scholar API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Unexpected Semantic Scholar response: {0}")]
    Decode(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// HTTP client for the Semantic Scholar Academic Graph API.
///
/// Works unauthenticated (shared public rate limit); `SEMANTIC_SCHOLAR_API_KEY`
/// raises the limit and is sent as `x-api-key`.
#[derive(Clone)]
pub struct ScholarClient {
    http: Client,
    api_key: Option<ApiKey>,
    base_url: String,
}

impl ScholarClient {
    pub fn from_env(http: Client) -> Self {
        let api_key = env::var("SEMANTIC_SCHOLAR_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .map(ApiKey);
        if api_key.is_some() {
            debug!("Semantic Scholar API key configured");
        } else {
            debug!("no SEMANTIC_SCHOLAR_API_KEY set, using the shared public rate limit");
        }
        Self {
            http,
            api_key,
            base_url: API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: None,
            base_url: base_url.to_string(),
        }
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, ScholarError> {
        Ok(Url::parse_with_params(
            &format!("{}{path}", self.base_url),
            params,
        )?)
    }

    async fn get_json_once<T: serde::de::DeserializeOwned>(
        &self,
        url: &Url,
    ) -> Result<T, ScholarError> {
        let mut req = self
            .http
            .get(url.clone())
            .header("User-Agent", crate::USER_AGENT);
        if let Some(ref key) = self.api_key {
            req = req.header("x-api-key", &key.0);
        }
        let response = req.send().await?;
        let status = response.status();
        match status.as_u16() {
            200..=299 => {
                let text = response.text().await?;
                serde_json::from_str(&text).map_err(|e| ScholarError::Decode(e.to_string()))
            }
            404 => Err(ScholarError::NotFound(url.path().to_string())),
            429 => {
                warn!("Semantic Scholar API rate limited");
                Err(ScholarError::RateLimited)
            }
            code => {
                let message = extract_error_message(
                    &response
                        .text()
                        .await
                        .unwrap_or_else(|_| format!("HTTP {status}")),
                );
                Err(ScholarError::Api { code, message })
            }
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &Url) -> Result<T, ScholarError> {
        let mut last_err = None;
        for attempt in 0..MAX_ATTEMPTS {
            match self.get_json_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if is_retriable(&e) => {
                    last_err = Some(e);
                    if attempt + 1 < MAX_ATTEMPTS {
                        let delay = jittered_backoff(attempt);
                        debug!(
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            "retrying Semantic Scholar request"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(ScholarError::RateLimited))
    }

    /// Return the best match for `title`.
    pub async fn search_paper(&self, title: &str) -> Result<Paper, ScholarError> {
        let url = self.url(
            "/paper/search",
            &[("query", title), ("limit", "1"), ("fields", SEARCH_FIELDS)],
        )?;
        let body: SearchResponse = self.get_json(&url).await?;
        body.data
            .into_iter()
            .next()
            .ok_or_else(|| ScholarError::NotFound(format!("no paper matching '{title}'")))
    }

    /// Fetch up to `max` references of `paper_id`, following the `next` offset across pages.
    pub async fn get_references(
        &self,
        paper_id: &str,
        max: usize,
    ) -> Result<Vec<Reference>, ScholarError> {
        let path = format!(
            "/paper/{}/references",
            utf8_percent_encode(paper_id, NON_ALPHANUMERIC)
        );
        let mut references = Vec::new();
        let mut offset = 0;

        while references.len() < max {
            let limit = (max - references.len()).min(PAGE_LIMIT).to_string();
            let offset_param = offset.to_string();
            let url = self.url(
                &path,
                &[
                    ("fields", REFERENCE_FIELDS),
                    ("offset", offset_param.as_str()),
                    ("limit", limit.as_str()),
                ],
            )?;
            let page: ReferencesPage = self.get_json(&url).await?;
            debug!(offset, count = page.data.len(), next = ?page.next, "references page");
            references.extend(page.data);
            match page.next {
                Some(next) if next > offset => offset = next,
                _ => break,
            }
        }

        references.truncate(max);
        if references.is_empty() {
            return Err(ScholarError::NotFound(format!(
                "no references listed for paper {paper_id}"
            )));
        }
        Ok(references)
    }
}

fn is_retriable(e: &ScholarError) -> bool {
    match e {
        ScholarError::RateLimited => true,
        ScholarError::Api { code, .. } => is_transient_status(*code),
        _ => false,
    }
}

/// Drop references Semantic Scholar could not resolve to a paper, and those
/// with neither an abstract nor a title to embed.
pub fn clean_references(references: Vec<Reference>) -> Vec<Reference> {
    let before = references.len();
    let cleaned: Vec<_> = references
        .into_iter()
        .filter(|r| r.cited_paper.paper_id.is_some())
        .filter(|r| !r.cited_paper.embedding_text().trim().is_empty())
        .collect();
    debug!(
        kept = cleaned.len(),
        dropped = before - cleaned.len(),
        "references cleaned"
    );
    cleaned
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v["message"]
                .as_str()
                .or_else(|| v["error"].as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(paper_id: Option<&str>) -> Reference {
        Reference {
            contexts: vec![],
            intents: vec![],
            is_influential: false,
            cited_paper: Paper {
                paper_id: paper_id.map(String::from),
                title: "T".into(),
                authors: vec![],
                year: None,
                abstract_: None,
            },
        }
    }

    #[test]
    fn clean_references_drops_unresolved() {
        let cleaned = clean_references(vec![reference(Some("a")), reference(None), reference(Some("b"))]);
        let ids: Vec<_> = cleaned
            .iter()
            .filter_map(|r| r.cited_paper.paper_id.as_deref())
            .collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn clean_references_drops_papers_without_text() {
        let mut untitled = reference(Some("u"));
        untitled.cited_paper.title = String::new();
        let mut blank = reference(Some("b"));
        blank.cited_paper.title = "  ".into();
        let mut abstract_only = reference(Some("c"));
        abstract_only.cited_paper.title = String::new();
        abstract_only.cited_paper.abstract_ = Some("Only an abstract.".into());

        let cleaned = clean_references(vec![untitled, reference(Some("a")), blank, abstract_only]);
        let ids: Vec<_> = cleaned
            .iter()
            .filter_map(|r| r.cited_paper.paper_id.as_deref())
            .collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[test]
    fn extract_error_message_prefers_json_fields() {
        assert_eq!(extract_error_message(r#"{"message":"bad"}"#), "bad");
        assert_eq!(extract_error_message(r#"{"error":"Paper not found"}"#), "Paper not found");
        assert_eq!(extract_error_message("plain text"), "plain text");
    }

    #[test]
    fn reference_tolerates_null_fields() {
        let r: Reference = serde_json::from_value(serde_json::json!({
            "contexts": null,
            "intents": null,
            "isInfluential": null,
            "citedPaper": {"paperId": null, "title": null, "authors": null, "year": null, "abstract": null}
        }))
        .unwrap();
        assert!(r.contexts.is_empty());
        assert!(r.intents.is_empty());
        assert!(!r.is_influential);
        assert!(r.cited_paper.paper_id.is_none());
        assert_eq!(r.cited_paper.title, "");
    }

    #[test]
    fn unknown_intent_maps_to_other() {
        let intents: Vec<Intent> =
            serde_json::from_str(r#"["methodology","background","result","comparison"]"#).unwrap();
        assert_eq!(
            intents,
            [Intent::Methodology, Intent::Background, Intent::Result, Intent::Other]
        );
    }

    #[test]
    fn embedding_text_falls_back_to_title() {
        let mut paper = reference(Some("a")).cited_paper;
        assert_eq!(paper.embedding_text(), "T");
        paper.abstract_ = Some("   ".into());
        assert_eq!(paper.embedding_text(), "T");
        paper.abstract_ = Some("An abstract.".into());
        assert_eq!(paper.embedding_text(), "An abstract.");
    }
}
