use async_trait::async_trait;

use crate::error::VectorResult;

/// Trait for embedding generation backends.
///
/// Implementations call a remote embedding API (OpenAI-compatible) or a
/// local model. Failures surface as errors here; graceful degradation to
/// the zero-vector sentinel is the `EmbeddingGenerator`'s job, not the
/// provider's.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Generate embeddings for a batch of texts.
    /// Length-preserving and order-preserving with respect to the input.
    async fn embed_batch(&self, texts: &[String]) -> VectorResult<Vec<Vec<f32>>>;
}
