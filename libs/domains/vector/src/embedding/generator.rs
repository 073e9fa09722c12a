use std::sync::Arc;

use core_config::{env_parse_or, ConfigError};
use tracing::{debug, warn};

use super::openai::{OpenAiConfig, OpenAiProvider};
use super::provider::EmbeddingProvider;
use crate::models::{BrandProfile, CopyVariant};

/// Default vector dimensionality (OpenAI text-embedding-3-small).
pub const DEFAULT_DIMENSIONS: usize = 1536;

/// Upstream APIs cap request sizes; batches are chunked to this many texts.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Number of leading components inspected by the zero-sentinel check.
/// A bounded prefix balances false-positive risk against cost; a genuinely
/// near-zero embedding could in principle be misclassified.
const ZERO_SENTINEL_PREFIX: usize = 10;

/// Embedding generator configuration (dimensionality and batching).
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub dimensions: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl EmbeddingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dimensions: env_parse_or("EMBEDDING_DIMENSIONS", DEFAULT_DIMENSIONS)?,
            batch_size: env_parse_or("EMBEDDING_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
        })
    }
}

/// Turns text into fixed-length vectors, degrading to the zero-vector
/// sentinel instead of raising when the backend is unconfigured or down.
///
/// The sentinel contract: an all-zero vector means "embedding unavailable",
/// never a valid semantic result. Callers must branch on
/// [`EmbeddingGenerator::is_zero_sentinel`] before upserting or searching.
pub struct EmbeddingGenerator {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    dimensions: usize,
    batch_size: usize,
}

impl EmbeddingGenerator {
    pub fn new(provider: Option<Arc<dyn EmbeddingProvider>>, config: EmbeddingConfig) -> Self {
        if provider.is_none() {
            warn!("No embedding backend configured, running in degraded mode (zero vectors)");
        }
        Self {
            provider,
            dimensions: config.dimensions,
            batch_size: config.batch_size.max(1),
        }
    }

    /// Construct from the environment. A missing API key is not an error:
    /// the generator comes up in degraded mode.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = EmbeddingConfig::from_env()?;
        let provider = OpenAiConfig::from_env(config.dimensions)
            .map(|c| Arc::new(OpenAiProvider::new(c)) as Arc<dyn EmbeddingProvider>);
        Ok(Self::new(provider, config))
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn is_degraded(&self) -> bool {
        self.provider.is_none()
    }

    /// The "embedding unavailable" sentinel for the configured dimensionality.
    pub fn zero_vector(&self) -> Vec<f32> {
        vec![0.0; self.dimensions]
    }

    /// Whether a vector is the degradation sentinel: all of the first 10
    /// components are exactly `0.0`.
    pub fn is_zero_sentinel(vector: &[f32]) -> bool {
        vector.iter().take(ZERO_SENTINEL_PREFIX).all(|c| *c == 0.0)
    }

    /// Embed a batch of texts. Length- and order-preserving.
    ///
    /// Requests are chunked to the configured batch size; a failed chunk
    /// degrades only that chunk to zero vectors, not the whole batch.
    /// This method never fails; degradation is the error channel.
    pub async fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        let Some(provider) = &self.provider else {
            debug!(
                count = texts.len(),
                "Embedding backend not configured, returning zero vectors"
            );
            return vec![self.zero_vector(); texts.len()];
        };

        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            match provider.embed_batch(chunk).await {
                Ok(vectors) if vectors.len() == chunk.len() => out.extend(vectors),
                Ok(vectors) => {
                    warn!(
                        provider = provider.name(),
                        expected = chunk.len(),
                        returned = vectors.len(),
                        "Embedding backend returned wrong batch shape, degrading chunk"
                    );
                    out.extend(std::iter::repeat_with(|| self.zero_vector()).take(chunk.len()));
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        error = %e,
                        chunk_size = chunk.len(),
                        "Embedding chunk failed, degrading to zero vectors"
                    );
                    out.extend(std::iter::repeat_with(|| self.zero_vector()).take(chunk.len()));
                }
            }
        }
        out
    }

    /// Embed a single text.
    pub async fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await;
        vectors.pop().unwrap_or_else(|| self.zero_vector())
    }

    /// Embed a brand profile via its deterministic text serialization.
    pub async fn embed_brand_profile(&self, brand: &BrandProfile) -> Vec<f32> {
        self.embed_text(&brand.embedding_text()).await
    }

    /// Embed an ad-copy variant via its deterministic text serialization.
    pub async fn embed_copy_variant(&self, variant: &CopyVariant) -> Vec<f32> {
        self.embed_text(&variant.embedding_text()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::provider::MockEmbeddingProvider;
    use crate::error::VectorError;

    fn generator_with(
        provider: MockEmbeddingProvider,
        dimensions: usize,
        batch_size: usize,
    ) -> EmbeddingGenerator {
        EmbeddingGenerator::new(
            Some(Arc::new(provider)),
            EmbeddingConfig {
                dimensions,
                batch_size,
            },
        )
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("text {}", i)).collect()
    }

    #[tokio::test]
    async fn test_no_provider_yields_zero_vectors() {
        let generator = EmbeddingGenerator::new(None, EmbeddingConfig::default());
        assert!(generator.is_degraded());

        let vectors = generator.embed_batch(&texts(3)).await;
        assert_eq!(vectors.len(), 3);
        for v in &vectors {
            assert_eq!(v.len(), 1536);
            assert!(v.iter().all(|c| *c == 0.0));
            assert!(EmbeddingGenerator::is_zero_sentinel(v));
        }
    }

    #[tokio::test]
    async fn test_batches_are_chunked() {
        let mut provider = MockEmbeddingProvider::new();
        provider.expect_name().return_const("mock");
        // 5 texts with batch size 2 -> chunks of 2, 2, 1
        provider
            .expect_embed_batch()
            .times(3)
            .returning(|chunk| Ok(vec![vec![0.5; 4]; chunk.len()]));

        let generator = generator_with(provider, 4, 2);
        let vectors = generator.embed_batch(&texts(5)).await;

        assert_eq!(vectors.len(), 5);
        assert!(vectors.iter().all(|v| !EmbeddingGenerator::is_zero_sentinel(v)));
    }

    #[tokio::test]
    async fn test_failed_chunk_degrades_only_that_chunk() {
        let mut provider = MockEmbeddingProvider::new();
        provider.expect_name().return_const("mock");

        let mut call = 0;
        provider.expect_embed_batch().times(2).returning(move |chunk| {
            call += 1;
            if call == 1 {
                Err(VectorError::Embedding("rate limited".to_string()))
            } else {
                Ok(vec![vec![0.5; 4]; chunk.len()])
            }
        });

        let generator = generator_with(provider, 4, 2);
        let vectors = generator.embed_batch(&texts(4)).await;

        assert_eq!(vectors.len(), 4);
        assert!(EmbeddingGenerator::is_zero_sentinel(&vectors[0]));
        assert!(EmbeddingGenerator::is_zero_sentinel(&vectors[1]));
        assert!(!EmbeddingGenerator::is_zero_sentinel(&vectors[2]));
        assert!(!EmbeddingGenerator::is_zero_sentinel(&vectors[3]));
    }

    #[tokio::test]
    async fn test_wrong_shape_response_degrades_chunk() {
        let mut provider = MockEmbeddingProvider::new();
        provider.expect_name().return_const("mock");
        provider
            .expect_embed_batch()
            .returning(|_| Ok(vec![vec![0.5; 4]]));

        let generator = generator_with(provider, 4, 10);
        let vectors = generator.embed_batch(&texts(3)).await;

        assert_eq!(vectors.len(), 3);
        assert!(vectors.iter().all(|v| EmbeddingGenerator::is_zero_sentinel(v)));
    }

    #[test]
    fn test_sentinel_checks_first_ten_components_only() {
        let mut vector = vec![0.0; 1536];
        assert!(EmbeddingGenerator::is_zero_sentinel(&vector));

        vector[3] = 0.01;
        assert!(!EmbeddingGenerator::is_zero_sentinel(&vector));

        // Non-zero past the checked prefix is still classified as sentinel:
        // a known approximation, not a guarantee.
        let mut tail_only = vec![0.0; 1536];
        tail_only[100] = 0.7;
        assert!(EmbeddingGenerator::is_zero_sentinel(&tail_only));
    }

    #[tokio::test]
    async fn test_embed_brand_profile_uses_serialized_text() {
        let brand = BrandProfile {
            campaign_id: "camp1".to_string(),
            brand_name: "Acme".to_string(),
            website_url: None,
            industry: Some("Robotics".to_string()),
            tagline: None,
            value_propositions: vec![],
            tone_summary: None,
            key_terms: vec![],
            confidence_score: 0.9,
        };
        let expected = brand.embedding_text();

        let mut provider = MockEmbeddingProvider::new();
        provider.expect_name().return_const("mock");
        provider
            .expect_embed_batch()
            .withf(move |chunk| chunk == [expected.clone()])
            .returning(|_| Ok(vec![vec![0.5; 4]]));

        let generator = generator_with(provider, 4, 100);
        let vector = generator.embed_brand_profile(&brand).await;
        assert!(!EmbeddingGenerator::is_zero_sentinel(&vector));
    }

    #[test]
    fn test_config_from_env() {
        temp_env::with_vars(
            [
                ("EMBEDDING_DIMENSIONS", Some("768")),
                ("EMBEDDING_BATCH_SIZE", None),
            ],
            || {
                let config = EmbeddingConfig::from_env().unwrap();
                assert_eq!(config.dimensions, 768);
                assert_eq!(config.batch_size, 100);
            },
        );
    }
}
