//! Identity and timestamp primitives
//!
//! Every primitive is a pattern-constrained string. Values are checked on
//! construction and on every parse, and the original text is kept verbatim:
//! an offset timestamp such as `2025-01-15T10:30:00+05:30` is accepted but
//! never normalized to UTC.

use crate::ValidationError;
use chrono::{DateTime, FixedOffset, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// PATTERNS
// ============================================================================

pub const UUID_PATTERN: &str =
    r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$";
/// Digits are ASCII only.
pub const TIMESTAMP_PATTERN: &str =
    r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}(\.[0-9]{3})?(Z|[+-][0-9]{2}:[0-9]{2})$";
pub const OPERATION_ID_PATTERN: &str =
    r"^op-[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$";
pub const PROGRESS_TOKEN_PATTERN: &str =
    r"^pt-[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$";

static UUID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(UUID_PATTERN).expect("valid uuid regex"));
static TIMESTAMP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(TIMESTAMP_PATTERN).expect("valid timestamp regex"));
static OPERATION_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(OPERATION_ID_PATTERN).expect("valid operation id regex"));
static PROGRESS_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(PROGRESS_TOKEN_PATTERN).expect("valid progress token regex"));

/// Defines a validated string newtype backed by one of the patterns above.
macro_rules! pattern_string {
    ($(#[$meta:meta])* $name:ident, field = $field:literal, pattern = $pattern:ident, regex = $regex:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// The exact pattern values must match.
            pub const PATTERN: &'static str = $pattern;

            /// Validate and wrap a string.
            pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                if $regex.is_match(&value) {
                    Ok(Self(value))
                } else {
                    Err(ValidationError::InvalidFormat {
                        field: $field,
                        value,
                        pattern: $pattern,
                    })
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

pattern_string!(
    /// Lowercase, dashed 8-4-4-4-12 hex UUID string.
    UuidString,
    field = "uuid",
    pattern = UUID_PATTERN,
    regex = UUID_RE
);

pattern_string!(
    /// Operation identifier: `op-` followed by a lowercase UUID.
    OperationId,
    field = "operationId",
    pattern = OPERATION_ID_PATTERN,
    regex = OPERATION_ID_RE
);

pattern_string!(
    /// Progress token: `pt-` followed by a lowercase UUID.
    ProgressToken,
    field = "progressToken",
    pattern = PROGRESS_TOKEN_PATTERN,
    regex = PROGRESS_TOKEN_RE
);

pattern_string!(
    /// ISO-8601 timestamp with mandatory `Z` or `±HH:MM` offset and optional
    /// millisecond fraction.
    Timestamp,
    field = "timestamp",
    pattern = TIMESTAMP_PATTERN,
    regex = TIMESTAMP_RE
);

impl UuidString {
    pub fn from_uuid(uuid: Uuid) -> Self {
        // Uuid's Display is lowercase and hyphenated.
        Self(uuid.to_string())
    }
}

impl OperationId {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(format!("op-{uuid}"))
    }

    /// The UUID portion, without the `op-` prefix.
    pub fn uuid_part(&self) -> &str {
        &self.0[3..]
    }
}

impl ProgressToken {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(format!("pt-{uuid}"))
    }

    /// The UUID portion, without the `pt-` prefix.
    pub fn uuid_part(&self) -> &str {
        &self.0[3..]
    }
}

// ============================================================================
// TIMESTAMP PRECISION
// ============================================================================

/// Fraction emitted when formatting generated timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum TimestampPrecision {
    /// `2025-01-15T10:30:00Z`
    #[default]
    Seconds,
    /// `2025-01-15T10:30:00.000Z`
    Millis,
}

impl TimestampPrecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimestampPrecision::Seconds => "seconds",
            TimestampPrecision::Millis => "millis",
        }
    }
}

impl fmt::Display for TimestampPrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimestampPrecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "seconds" | "s" => Ok(TimestampPrecision::Seconds),
            "millis" | "ms" => Ok(TimestampPrecision::Millis),
            other => Err(format!("unknown timestamp precision: {other}")),
        }
    }
}

impl Timestamp {
    /// Format a UTC instant with a `Z` suffix.
    pub fn from_datetime(instant: DateTime<Utc>, precision: TimestampPrecision) -> Self {
        let text = match precision {
            TimestampPrecision::Seconds => instant.format("%Y-%m-%dT%H:%M:%SZ"),
            TimestampPrecision::Millis => instant.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        };
        Self(text.to_string())
    }

    /// Interpret the timestamp as a calendar instant, keeping its offset.
    ///
    /// The pattern alone does not reject impossible dates such as month 13;
    /// this does.
    pub fn to_datetime(&self) -> Result<DateTime<FixedOffset>, ValidationError> {
        DateTime::parse_from_rfc3339(&self.0).map_err(|e| ValidationError::Inconsistent {
            field: "timestamp",
            reason: format!("{:?} is not a valid instant: {e}", self.0),
        })
    }

    /// Whether the timestamp carries the `Z` designator.
    pub fn is_utc(&self) -> bool {
        self.0.ends_with('Z')
    }
}

// =============================================================================
// TESTS
// =============================================================================
