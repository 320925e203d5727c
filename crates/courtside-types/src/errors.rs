use thiserror::Error;

pub type Result<T, E = CourtsideError> = std::result::Result<T, E>;

/// Unified error type covering common failure scenarios across subsystems.
#[derive(Debug, Error)]
pub enum CourtsideError {
    /// Unknown metric code, player outside the roster, or malformed record.
    #[error("validation error: {0}")]
    Validation(String),
    #[error("event store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("point counter drifted: local {local}, store holds {stored} events")]
    ConcurrentDrift { local: u32, stored: u32 },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("operational error: {0}")]
    Ops(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CourtsideError {
    pub fn validation(message: impl Into<String>) -> Self {
        CourtsideError::Validation(message.into())
    }

    pub fn store(message: impl Into<String>) -> Self {
        CourtsideError::StoreUnavailable(message.into())
    }

    /// Errors that leave the recorder exactly where it was before the input.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CourtsideError::Validation(_)
                | CourtsideError::StoreUnavailable(_)
                | CourtsideError::ConcurrentDrift { .. }
        )
    }
}
