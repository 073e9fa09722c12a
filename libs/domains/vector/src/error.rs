use thiserror::Error;

#[derive(Debug, Error)]
pub enum VectorError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Qdrant error: {0}")]
    Qdrant(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type VectorResult<T> = Result<T, VectorError>;

impl VectorError {
    /// Whether the orchestrator should retry the invocation that hit this
    /// error. Index connectivity failures are transient; everything else is
    /// fatal for the invocation. Embedding-backend failures never surface
    /// here as errors at all; the generator degrades to zero vectors.
    pub fn is_retryable(&self) -> bool {
        matches!(self, VectorError::Qdrant(_))
    }
}

impl From<qdrant_client::QdrantError> for VectorError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        VectorError::Qdrant(err.to_string())
    }
}

impl From<reqwest::Error> for VectorError {
    fn from(err: reqwest::Error) -> Self {
        VectorError::Embedding(err.to_string())
    }
}

impl From<serde_json::Error> for VectorError {
    fn from(err: serde_json::Error) -> Self {
        VectorError::Internal(format!("JSON error: {}", err))
    }
}

impl From<core_config::ConfigError> for VectorError {
    fn from(err: core_config::ConfigError) -> Self {
        VectorError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(VectorError::Qdrant("connection refused".into()).is_retryable());
        assert!(!VectorError::Validation("empty batch".into()).is_retryable());
        assert!(!VectorError::Embedding("api error".into()).is_retryable());
        assert!(!VectorError::Config("missing key".into()).is_retryable());
    }
}
