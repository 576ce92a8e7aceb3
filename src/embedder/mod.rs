/// Embedder trait and shared types for text embedding.
pub mod mock;
pub mod openai;

use thiserror::Error;
use tracing::warn;

/// Errors that can occur during embedding operations.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("unexpected embedding response: {0}")]
    Response(String),

    #[error("expected {expected} dimensions, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("no API key configured (set embedding.api_key or OPENAI_API_KEY)")]
    MissingApiKey,
}

/// Trait for text embedding implementations.
///
/// All implementations must be `Send + Sync` so one provider can be shared by
/// the indexing pipeline and the retriever.
pub trait Embedder: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    /// Embed multiple text strings into vectors.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError>;

    /// Return the dimensionality of the embedding vectors.
    fn dimensions(&self) -> usize;
}

/// Embed `text`, substituting an all-zero vector of the provider's
/// dimensionality when the provider fails.
///
/// A zero vector has cosine similarity 0.0 against anything, so such records
/// never pass a positive search threshold.
pub fn embed_or_zero<E: Embedder + ?Sized>(embedder: &E, text: &str) -> Vec<f32> {
    match embedder.embed(text) {
        Ok(vector) => vector,
        Err(e) => {
            warn!("Embedding failed, using zero vector: {e}");
            vec![0.0; embedder.dimensions()]
        }
    }
}
