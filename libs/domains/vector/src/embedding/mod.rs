mod generator;
mod openai;
mod provider;

pub use generator::{EmbeddingConfig, EmbeddingGenerator, DEFAULT_BATCH_SIZE, DEFAULT_DIMENSIONS};
pub use openai::{OpenAiConfig, OpenAiProvider};
pub use provider::EmbeddingProvider;
