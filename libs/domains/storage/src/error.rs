use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Local source file (or remote object, for downloads) does not exist.
    /// Non-retryable: the orchestrator should fail the invocation.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network or service failure talking to the object store.
    /// Retryable: left to the orchestrator's backoff policy.
    #[error("Transient store error: {0}")]
    Transient(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Whether the orchestrator should retry the invocation that hit this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Transient(_))
    }
}

impl From<core_config::ConfigError> for StorageError {
    fn from(err: core_config::ConfigError) -> Self {
        StorageError::Config(err.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(err.to_string())
        } else {
            StorageError::Internal(format!("IO error: {}", err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(StorageError::Transient("timeout".into()).is_retryable());
        assert!(!StorageError::NotFound("/tmp/missing.png".into()).is_retryable());
        assert!(!StorageError::Config("bad endpoint".into()).is_retryable());
    }

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: StorageError = io.into();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
