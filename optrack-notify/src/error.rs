//! Error types for notification delivery

use optrack_core::OptrackError;
use thiserror::Error;

/// Wire-level envelope problems.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("Unsupported JSON-RPC version: {0:?}")]
    UnsupportedVersion(String),

    #[error("Method mismatch: expected {expected}, got {actual}")]
    MethodMismatch {
        expected: &'static str,
        actual: String,
    },

    #[error("Unknown notification method: {0}")]
    UnknownMethod(String),

    #[error("Missing params for {method}")]
    MissingParams { method: String },

    #[error("Invalid params for {method}: {reason}")]
    InvalidParams { method: String, reason: String },
}

/// Transport failures reported by a sink.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("Sink rejected {method}: {reason}")]
    Rejected { method: String, reason: String },

    #[error("Sink lock poisoned")]
    LockPoisoned,
}

/// Master error type for the notification layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Core(#[from] OptrackError),
}

impl From<serde_json::Error> for NotifyError {
    fn from(err: serde_json::Error) -> Self {
        NotifyError::Core(OptrackError::from(err))
    }
}

/// Result type alias for notification operations.
pub type NotifyResult<T> = Result<T, NotifyError>;
