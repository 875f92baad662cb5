//! Text embeddings: the Cohere embed client and vector similarity.

pub(crate) mod client;
mod similarity;
pub(crate) mod types;

pub use client::{CohereClient, EmbedError, Embedder};
pub use similarity::cosine_similarity;
