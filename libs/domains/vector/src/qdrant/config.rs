use core_config::env_parse_or;

use crate::embedding::DEFAULT_DIMENSIONS;
use crate::error::VectorResult;

/// Qdrant connection configuration
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Vector size for both collections; must match the embedding
    /// generator's dimensionality.
    pub dimensions: usize,
}

impl QdrantConfig {
    pub fn new(url: String) -> Self {
        Self {
            url,
            api_key: None,
            timeout_secs: 30,
            dimensions: DEFAULT_DIMENSIONS,
        }
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Reads `QDRANT_URL`, `QDRANT_API_KEY`, `QDRANT_TIMEOUT_SECS` and
    /// `EMBEDDING_DIMENSIONS` (shared with the embedding generator so the
    /// collection schema and the vectors always agree).
    pub fn from_env() -> VectorResult<Self> {
        let url =
            std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://localhost:6334".to_string());

        let api_key = std::env::var("QDRANT_API_KEY").ok();

        Ok(Self {
            url,
            api_key,
            timeout_secs: env_parse_or("QDRANT_TIMEOUT_SECS", 30)?,
            dimensions: env_parse_or("EMBEDDING_DIMENSIONS", DEFAULT_DIMENSIONS)?,
        })
    }
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self::new("http://localhost:6334".to_string())
    }
}
