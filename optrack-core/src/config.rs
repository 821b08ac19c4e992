//! Configuration for optrack
//!
//! Both settings have defaults and can be overridden from the environment:
//!
//! | Variable                      | Values                         | Default   |
//! |-------------------------------|--------------------------------|-----------|
//! | `OPTRACK_TIMESTAMP_PRECISION` | `seconds`, `millis`            | `seconds` |
//! | `OPTRACK_VERBOSITY`           | `coarse`, `normal`, `fine`, `debug` | `normal` |

use crate::clock::SystemClock;
use crate::{ConfigError, OptrackResult, TimestampPrecision};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const ENV_TIMESTAMP_PRECISION: &str = "OPTRACK_TIMESTAMP_PRECISION";
pub const ENV_VERBOSITY: &str = "OPTRACK_VERBOSITY";

/// How much detail progress notifications carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum VerbosityMode {
    /// Stage changes only.
    Coarse,
    /// Every update, without message or metadata.
    #[default]
    Normal,
    /// Every update with its message.
    Fine,
    /// Everything.
    Debug,
}

impl VerbosityMode {
    pub const ALL: [VerbosityMode; 4] = [
        VerbosityMode::Coarse,
        VerbosityMode::Normal,
        VerbosityMode::Fine,
        VerbosityMode::Debug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VerbosityMode::Coarse => "coarse",
            VerbosityMode::Normal => "normal",
            VerbosityMode::Fine => "fine",
            VerbosityMode::Debug => "debug",
        }
    }

    /// Whether updates that do not change stage are delivered at all.
    pub fn includes_intra_stage(&self) -> bool {
        !matches!(self, VerbosityMode::Coarse)
    }

    pub fn includes_message(&self) -> bool {
        matches!(self, VerbosityMode::Fine | VerbosityMode::Debug)
    }

    pub fn includes_metadata(&self) -> bool {
        matches!(self, VerbosityMode::Debug)
    }
}

impl fmt::Display for VerbosityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerbosityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VerbosityMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("expected one of coarse, normal, fine, debug; got '{s}'"))
    }
}

/// Runtime settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptrackConfig {
    #[serde(alias = "timestamp_precision")]
    pub timestamp_precision: TimestampPrecision,
    pub verbosity: VerbosityMode,
}

impl OptrackConfig {
    /// Read overrides from the process environment. Unset variables keep
    /// their defaults; an unparseable value is an error.
    pub fn from_env() -> OptrackResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> OptrackResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            timestamp_precision: parse_setting(
                &lookup,
                ENV_TIMESTAMP_PRECISION,
                defaults.timestamp_precision,
            )?,
            verbosity: parse_setting(&lookup, ENV_VERBOSITY, defaults.verbosity)?,
        })
    }

    /// A system clock honouring the configured precision.
    pub fn clock(&self) -> SystemClock {
        SystemClock::with_precision(self.timestamp_precision)
    }
}

fn parse_setting<T, F>(lookup: &F, key: &str, default: T) -> OptrackResult<T>
where
    T: FromStr<Err = String>,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|reason| {
            ConfigError::InvalidValue {
                field: key.to_string(),
                value: raw,
                reason,
            }
            .into()
        }),
    }
}

// =============================================================================
// TESTS
// =============================================================================
