use domain_storage::StorageError;
use domain_vector::VectorError;

pub type ActivityResult<T> = Result<T, ActivityError>;

/// Activity-level error taxonomy, classified for the orchestrator's retry
/// policy via [`ActivityError::is_retryable`].
///
/// A degraded embedding backend never surfaces here: it is an operating
/// mode that produces sentinel data, reported through `skipped` counts.
#[derive(Debug, thiserror::Error)]
pub enum ActivityError {
    /// Malformed input or a missing source file. Fatal for this invocation;
    /// retrying with the same input cannot succeed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A dependency was temporarily unavailable. Left for the
    /// orchestrator's backoff policy.
    #[error("Transient error: {0}")]
    Transient(String),

    /// The host requested cancellation; the activity unwound cooperatively.
    #[error("Activity cancelled")]
    Cancelled,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Vector(#[from] VectorError),
}

impl ActivityError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Cancelled => false,
            Self::Transient(_) => true,
            Self::Storage(e) => e.is_retryable(),
            Self::Vector(e) => e.is_retryable(),
        }
    }
}
