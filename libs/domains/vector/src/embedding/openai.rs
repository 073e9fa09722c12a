use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::EmbeddingProvider;
use crate::error::{VectorError, VectorResult};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// OpenAI-compatible embedding backend configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
}

impl OpenAiConfig {
    pub fn new(api_key: String, dimensions: usize) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            dimensions,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Load from the environment: the primary credential set
    /// (`EMBEDDING_API_KEY`/`EMBEDDING_BASE_URL`) is preferred, with
    /// `OPENAI_API_KEY`/`OPENAI_BASE_URL` as the fallback set.
    ///
    /// Returns `None` when no backend is configured at all; the pipeline
    /// then runs in degraded mode (zero-vector sentinels), which is a
    /// recognized operating state, not an error.
    pub fn from_env(dimensions: usize) -> Option<Self> {
        let (api_key, base_url) = match std::env::var("EMBEDDING_API_KEY") {
            Ok(key) => (
                key,
                std::env::var("EMBEDDING_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            ),
            Err(_) => {
                let key = std::env::var("OPENAI_API_KEY").ok()?;
                let base_url = std::env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
                (key, base_url)
            }
        };

        let model = std::env::var("EMBEDDING_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Some(Self {
            api_key,
            base_url,
            model,
            dimensions,
        })
    }
}

/// OpenAI embeddings provider.
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn embed_batch(&self, texts: &[String]) -> VectorResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        // The dimensions parameter is only supported by the v3 model family
        let dimensions = self
            .config
            .model
            .starts_with("text-embedding-3")
            .then_some(self.config.dimensions as u32);

        let request = EmbeddingRequest {
            model: self.config.model.clone(),
            input: texts.to_vec(),
            dimensions,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(VectorError::Embedding(format!(
                "Embedding API error ({}): {}",
                status, error_text
            )));
        }

        let embedding_response: EmbeddingResponse = response.json().await?;

        if embedding_response.data.len() != texts.len() {
            return Err(VectorError::Embedding(format!(
                "Embedding API returned {} vectors for {} inputs",
                embedding_response.data.len(),
                texts.len()
            )));
        }

        // Sort by index to maintain input order
        let mut data = embedding_response.data;
        data.sort_by_key(|d| d.index);

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}
