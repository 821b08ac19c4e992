//! Cancellation tokens
//!
//! A token is either not requested (no side fields) or requested (reason,
//! source and timestamp all present). Requesting cancellation builds a new
//! token; an existing token is never flipped in place, so observers holding
//! the old value never see it change.

use crate::clock::{Clock, SystemClock};
use crate::{OptrackError, OptrackResult, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Why an operation was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    UserRequested,
    Timeout,
    ResourceLimit,
    ErrorThreshold,
}

impl CancellationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancellationReason::UserRequested => "user_requested",
            CancellationReason::Timeout => "timeout",
            CancellationReason::ResourceLimit => "resource_limit",
            CancellationReason::ErrorThreshold => "error_threshold",
        }
    }
}

impl fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CancellationReason {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user_requested" => Ok(CancellationReason::UserRequested),
            "timeout" => Ok(CancellationReason::Timeout),
            "resource_limit" => Ok(CancellationReason::ResourceLimit),
            "error_threshold" => Ok(CancellationReason::ErrorThreshold),
            other => Err(ValidationError::Inconsistent {
                field: "reason",
                reason: format!("unknown cancellation reason: {other}"),
            }),
        }
    }
}

/// Who initiated the cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum CancellationSource {
    Client,
    Server,
}

impl CancellationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancellationSource::Client => "client",
            CancellationSource::Server => "server",
        }
    }
}

impl fmt::Display for CancellationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CancellationSource {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(CancellationSource::Client),
            "server" => Ok(CancellationSource::Server),
            other => Err(ValidationError::Inconsistent {
                field: "source",
                reason: format!("unknown cancellation source: {other}"),
            }),
        }
    }
}

/// Cancellation request token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", try_from = "CancellationTokenParts")]
pub struct CancellationToken {
    is_cancellation_requested: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<CancellationReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<CancellationSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<Timestamp>,
}

/// Unvalidated form of [`CancellationToken`]; also the inbound wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationTokenParts {
    #[serde(alias = "is_cancellation_requested")]
    pub is_cancellation_requested: bool,
    #[serde(default)]
    pub reason: Option<CancellationReason>,
    #[serde(default)]
    pub source: Option<CancellationSource>,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

impl CancellationToken {
    /// A token with no cancellation requested.
    pub const fn inactive() -> Self {
        Self {
            is_cancellation_requested: false,
            reason: None,
            source: None,
            timestamp: None,
        }
    }

    /// A requested token with every side field supplied.
    pub fn requested(
        reason: CancellationReason,
        source: CancellationSource,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            is_cancellation_requested: true,
            reason: Some(reason),
            source: Some(source),
            timestamp: Some(timestamp),
        }
    }

    /// Build a token from a flag plus optional reason and source, stamping the
    /// current time when cancellation is requested.
    ///
    /// # Errors
    /// Fails when `cancelled` is true and `reason` or `source` is missing, or
    /// when `cancelled` is false and either is supplied.
    pub fn new(
        cancelled: bool,
        reason: Option<CancellationReason>,
        source: Option<CancellationSource>,
    ) -> OptrackResult<Self> {
        let timestamp = cancelled.then(|| SystemClock::new().now());
        Self::from_parts(CancellationTokenParts {
            is_cancellation_requested: cancelled,
            reason,
            source,
            timestamp,
        })
    }

    pub fn from_parts(parts: CancellationTokenParts) -> OptrackResult<Self> {
        validate_token(&parts)?;
        Ok(Self {
            is_cancellation_requested: parts.is_cancellation_requested,
            reason: parts.reason,
            source: parts.source,
            timestamp: parts.timestamp,
        })
    }

    /// Return a new requested token stamped with the system clock. `self` is
    /// left untouched.
    pub fn request(&self, reason: CancellationReason, source: CancellationSource) -> Self {
        self.request_with(&SystemClock::new(), reason, source)
    }

    /// Like [`request`](Self::request) with an explicit clock.
    pub fn request_with(
        &self,
        clock: &impl Clock,
        reason: CancellationReason,
        source: CancellationSource,
    ) -> Self {
        Self::requested(reason, source, clock.now())
    }

    pub fn is_cancellation_requested(&self) -> bool {
        self.is_cancellation_requested
    }

    pub fn reason(&self) -> Option<CancellationReason> {
        self.reason
    }

    pub fn source(&self) -> Option<CancellationSource> {
        self.source
    }

    pub fn timestamp(&self) -> Option<&Timestamp> {
        self.timestamp.as_ref()
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::inactive()
    }
}

impl TryFrom<CancellationTokenParts> for CancellationToken {
    type Error = OptrackError;

    fn try_from(parts: CancellationTokenParts) -> Result<Self, Self::Error> {
        Self::from_parts(parts)
    }
}

fn validate_token(parts: &CancellationTokenParts) -> Result<(), ValidationError> {
    let present: Vec<&'static str> = [
        ("reason", parts.reason.is_some()),
        ("source", parts.source.is_some()),
        ("timestamp", parts.timestamp.is_some()),
    ]
    .into_iter()
    .filter_map(|(field, is_set)| is_set.then_some(field))
    .collect();

    if parts.is_cancellation_requested {
        let missing: Vec<&'static str> = ["reason", "source", "timestamp"]
            .into_iter()
            .filter(|field| !present.contains(field))
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                fields: missing,
                reason: "required when cancellation is requested".to_string(),
            });
        }
    } else if !present.is_empty() {
        return Err(ValidationError::FieldNotAllowed {
            fields: present,
            reason: "must be absent when cancellation is not requested".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
