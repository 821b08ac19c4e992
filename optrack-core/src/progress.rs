//! Progress metrics
//!
//! A bounded progress record. When `total` is known and positive the
//! percentage must agree with `current / total * 100` to within
//! [`PERCENTAGE_TOLERANCE`], compared as an absolute difference.

use crate::validation::ValidateRange;
use crate::{OptrackResult, ValidationError};
use serde::{Deserialize, Serialize};

/// Absolute tolerance for the percentage identity.
pub const PERCENTAGE_TOLERANCE: f64 = 0.01;

/// Unit used when none is given.
pub const DEFAULT_PROGRESS_UNIT: &str = "items";

fn default_unit() -> String {
    DEFAULT_PROGRESS_UNIT.to_string()
}

/// Progress tracking metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(try_from = "ProgressMetricsParts")]
pub struct ProgressMetrics {
    current: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    total: Option<i64>,
    unit: String,
    percentage: f64,
}

/// Unvalidated form of [`ProgressMetrics`]; also the inbound wire shape.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProgressMetricsParts {
    pub current: i64,
    #[serde(default)]
    pub total: Option<i64>,
    #[serde(default = "default_unit")]
    pub unit: String,
    pub percentage: f64,
}

impl ProgressMetrics {
    /// Validate a progress record with the default unit.
    pub fn new(current: i64, total: Option<i64>, percentage: f64) -> OptrackResult<Self> {
        Self::from_parts(ProgressMetricsParts {
            current,
            total,
            unit: default_unit(),
            percentage,
        })
    }

    /// Validate a progress record from its raw parts.
    pub fn from_parts(parts: ProgressMetricsParts) -> OptrackResult<Self> {
        validate_progress(&parts)?;
        Ok(Self {
            current: parts.current,
            total: parts.total,
            unit: parts.unit,
            percentage: parts.percentage,
        })
    }

    /// Derive the percentage from `current` and `total`.
    pub fn from_counts(current: i64, total: i64) -> OptrackResult<Self> {
        let percentage = if total > 0 {
            current as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Self::new(current, Some(total), percentage)
    }

    /// Nothing done yet, total unknown.
    pub fn zero() -> Self {
        Self {
            current: 0,
            total: None,
            unit: default_unit(),
            percentage: 0.0,
        }
    }

    /// Replace the unit label. The unit does not take part in validation.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn current(&self) -> i64 {
        self.current
    }

    pub fn total(&self) -> Option<i64> {
        self.total
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    /// True once `current` has reached a known positive total.
    pub fn is_complete(&self) -> bool {
        matches!(self.total, Some(total) if total > 0 && self.current >= total)
    }

    pub fn into_parts(self) -> ProgressMetricsParts {
        ProgressMetricsParts {
            current: self.current,
            total: self.total,
            unit: self.unit,
            percentage: self.percentage,
        }
    }
}

impl Default for ProgressMetrics {
    fn default() -> Self {
        Self::zero()
    }
}

impl TryFrom<ProgressMetricsParts> for ProgressMetrics {
    type Error = crate::OptrackError;

    fn try_from(parts: ProgressMetricsParts) -> Result<Self, Self::Error> {
        Self::from_parts(parts)
    }
}

fn validate_progress(parts: &ProgressMetricsParts) -> Result<(), ValidationError> {
    parts.current.validate_non_negative("current")?;
    parts.percentage.validate_range("percentage", 0.0, 100.0)?;

    if let Some(total) = parts.total.filter(|t| *t > 0) {
        let expected = parts.current as f64 / total as f64 * 100.0;
        if (parts.percentage - expected).abs() > PERCENTAGE_TOLERANCE {
            return Err(ValidationError::Inconsistent {
                field: "percentage",
                reason: format!(
                    "percentage ({}) inconsistent with current/total ({}/{} = {:.2})",
                    parts.percentage, parts.current, total, expected
                ),
            });
        }
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
