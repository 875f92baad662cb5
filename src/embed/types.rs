use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct EmbedRequest<'a> {
    pub texts: &'a [String],
    pub model: &'a str,
    pub input_type: &'a str,
    pub truncate: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct EmbedResponse {
    pub embeddings: Vec<Vec<f32>>,
}

/// Error body returned by the Cohere API on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub message: Option<String>,
}
