//! Identifier and timestamp sources
//!
//! The lifecycle engine never reads the wall clock directly. It asks a
//! [`Clock`] for the current time and an [`IdSource`] for fresh UUIDs, so a
//! driving service (or a test) decides where those come from.

use crate::{OperationId, ProgressToken, Timestamp, TimestampPrecision, UuidString};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant as a contract timestamp.
    fn now(&self) -> Timestamp;
}

/// Source of fresh identifiers.
pub trait IdSource: Send + Sync {
    /// A new lowercase UUID.
    fn new_uuid(&self) -> Uuid;

    fn operation_id(&self) -> OperationId {
        OperationId::from_uuid(self.new_uuid())
    }

    fn progress_token(&self) -> ProgressToken {
        ProgressToken::from_uuid(self.new_uuid())
    }
}

/// Wall clock in UTC plus random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemClock {
    precision: TimestampPrecision,
}

impl SystemClock {
    pub const fn new() -> Self {
        Self {
            precision: TimestampPrecision::Seconds,
        }
    }

    pub const fn with_precision(precision: TimestampPrecision) -> Self {
        Self { precision }
    }

    pub fn precision(&self) -> TimestampPrecision {
        self.precision
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_datetime(Utc::now(), self.precision)
    }
}

impl IdSource for SystemClock {
    fn new_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// A clock frozen at one instant. Useful for replay and deterministic tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedClock {
    at: Timestamp,
}

impl FixedClock {
    pub fn new(at: Timestamp) -> Self {
        Self { at }
    }

    pub fn at_datetime(instant: DateTime<Utc>, precision: TimestampPrecision) -> Self {
        Self::new(Timestamp::from_datetime(instant, precision))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.at.clone()
    }
}

// ============================================================================
// FREE FUNCTIONS (system clock)
// ============================================================================

/// Generate a lowercase v4 UUID string.
pub fn generate_uuid() -> UuidString {
    UuidString::from_uuid(SystemClock::new().new_uuid())
}

/// Generate an `op-{uuid}` identifier.
pub fn generate_operation_id() -> OperationId {
    SystemClock::new().operation_id()
}

/// Generate a `pt-{uuid}` token.
pub fn generate_progress_token() -> ProgressToken {
    SystemClock::new().progress_token()
}

/// Current UTC time, second precision, `Z` suffix.
pub fn generate_timestamp() -> Timestamp {
    SystemClock::new().now()
}
