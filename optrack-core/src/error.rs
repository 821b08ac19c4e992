//! Error types for optrack operations

use crate::LifecycleStatus;
use thiserror::Error;

/// Schema validation failures: malformed primitives, out-of-range values and
/// cross-field invariant violations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid format for {field}: {value:?} does not match {pattern}")]
    InvalidFormat {
        field: &'static str,
        value: String,
        pattern: &'static str,
    },

    #[error("Value out of range for {field}: {value} not in [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: String,
        min: String,
        max: String,
    },

    #[error("Field must not be empty: {field}")]
    Empty { field: &'static str },

    #[error("Required field(s) missing: {}; {reason}", .fields.join(", "))]
    RequiredFieldMissing {
        fields: Vec<&'static str>,
        reason: String,
    },

    #[error("Field(s) not allowed: {}; {reason}", .fields.join(", "))]
    FieldNotAllowed {
        fields: Vec<&'static str>,
        reason: String,
    },

    #[error("Inconsistent value for {field}: {reason}")]
    Inconsistent { field: &'static str, reason: String },
}

/// Lifecycle legality failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error(
        "Invalid transition: '{from}' -> '{to}'; legal targets: {}",
        format_targets(.allowed)
    )]
    InvalidTransition {
        from: LifecycleStatus,
        to: LifecycleStatus,
        allowed: Vec<LifecycleStatus>,
    },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all optrack errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OptrackError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Decode error: {reason}")]
    Decode { reason: String },
}

impl From<serde_json::Error> for OptrackError {
    fn from(err: serde_json::Error) -> Self {
        OptrackError::Decode {
            reason: err.to_string(),
        }
    }
}

/// Result type alias for optrack operations.
pub type OptrackResult<T> = Result<T, OptrackError>;

fn format_targets(targets: &[LifecycleStatus]) -> String {
    if targets.is_empty() {
        return "{} (terminal)".to_string();
    }
    let names: Vec<&str> = targets.iter().map(|s| s.as_str()).collect();
    format!("{{{}}}", names.join(", "))
}

// =============================================================================
// TESTS
// =============================================================================
