use crate::sync::ContextId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Cannot acquire a lock from a disposed context ({context})")]
    ContextDisposed { context: ContextId },

    #[error("Invalid timeout {millis}ms: must be non-negative or -1 (infinite)")]
    InvalidTimeout { millis: i64 },

    #[error("Invalid duration format '{input}': {message}")]
    InvalidDuration { input: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Mutual exclusion violated on {key}: {holders} concurrent holders")]
    ExclusionViolated { key: String, holders: usize },

    #[error("FIFO order violated: expected {expected:?}, got {actual:?}")]
    FairnessViolated {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("{0}")]
    Other(String),
}

impl SyncError {
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncError::ExclusionViolated { .. } | SyncError::FairnessViolated { .. } => 2,
            SyncError::ContextDisposed { .. } => 3,
            _ => 1,
        }
    }

    pub fn disposed(context: ContextId) -> Self {
        SyncError::ContextDisposed { context }
    }

    pub fn invalid_timeout(millis: i64) -> Self {
        SyncError::InvalidTimeout { millis }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
