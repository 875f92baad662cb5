use std::env;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use super::types::{ApiError, EmbedRequest, EmbedResponse};
use crate::retry::{MAX_ATTEMPTS, is_transient_status, jittered_backoff};

const API_BASE: &str = "https://api.cohere.com/v1";
const DEFAULT_MODEL: &str = "embed-english-v3.0";
const INPUT_TYPE: &str = "clustering";
/// Cohere accepts at most 96 texts per embed call.
const MAX_BATCH: usize = 96;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error(
        "COHERE_API_KEY not set. Create one at https://dashboard.cohere.com/api-keys and then: export COHERE_API_KEY='your_api_key'"
    )]
    ApiKeyNotSet,

    #[error("Cohere rejected the API key: {0}")]
    Unauthorized(String),

    #[error("Cohere API rate limit exceeded. Please retry later.")]
    RateLimited,

    #[error("Cohere API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("expected {expected} embeddings, got {got}")]
    CountMismatch { expected: usize, got: usize },

    #[error("Unexpected Cohere response: {0}")]
    Decode(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Turns texts into embedding vectors, one per input in order.
/// Implemented by `CohereClient` for production; mock implementations used in tests.
pub trait Embedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;
}

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Clone)]
pub struct CohereClient {
    http: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
}

impl CohereClient {
    pub fn from_env(http: Client) -> Result<Self, EmbedError> {
        let api_key = env::var("COHERE_API_KEY").map_err(|_| EmbedError::ApiKeyNotSet)?;
        if api_key.trim().is_empty() {
            return Err(EmbedError::ApiKeyNotSet);
        }
        let model = env::var("COHERE_MODEL")
            .ok()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Ok(Self {
            http,
            api_key: ApiKey(api_key.trim().to_string()),
            model,
            base_url: API_BASE.to_string(),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey("test-key".to_string()),
            model: DEFAULT_MODEL.to_string(),
            base_url: base_url.to_string(),
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let url = format!("{}/embed", self.base_url);
        let request = EmbedRequest {
            texts,
            model: &self.model,
            input_type: INPUT_TYPE,
            truncate: "END",
        };

        debug_assert!(
            url.starts_with("https://") || cfg!(test),
            "API key must only be sent over HTTPS"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key.0)
            .header("User-Agent", crate::USER_AGENT)
            .json(&request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = classify_api_error(status.as_u16(), &text);
            warn!(error = %err, "Cohere API error");
            return Err(err);
        }

        let text = response.text().await?;
        let body: EmbedResponse =
            serde_json::from_str(&text).map_err(|e| EmbedError::Decode(e.to_string()))?;
        if body.embeddings.len() != texts.len() {
            return Err(EmbedError::CountMismatch {
                expected: texts.len(),
                got: body.embeddings.len(),
            });
        }
        debug!(model = %self.model, count = texts.len(), "embedding batch complete");
        Ok(body.embeddings)
    }

    async fn embed_batch_with_retry(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut last_err = None;
        for attempt in 0..MAX_ATTEMPTS {
            match self.embed_batch(texts).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(e) if is_retriable(&e) => {
                    last_err = Some(e);
                    if attempt + 1 < MAX_ATTEMPTS {
                        let delay = jittered_backoff(attempt);
                        debug!(
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            "retrying after transient error"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(EmbedError::RateLimited))
    }
}

impl Embedder for CohereClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH) {
            embeddings.extend(self.embed_batch_with_retry(batch).await?);
        }
        Ok(embeddings)
    }
}

fn is_retriable(e: &EmbedError) -> bool {
    match e {
        EmbedError::RateLimited => true,
        EmbedError::Api { code, .. } => is_transient_status(*code),
        _ => false,
    }
}

fn classify_api_error(code: u16, body: &str) -> EmbedError {
    let message = serde_json::from_str::<ApiError>(body)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or_else(|| {
            let snippet: String = body.chars().take(200).collect();
            format!("HTTP {code}: {snippet}")
        });

    match code {
        401 => EmbedError::Unauthorized(message),
        429 => EmbedError::RateLimited,
        _ => EmbedError::Api { code, message },
    }
}
