//! Operation lifecycle status and the legal-transition table.
//!
//! # State Transition Diagram
//!
//! ```text
//! created ──→ running ──→ completed
//!               │  ↑ ──→ failed
//!               ↓  │ ──→ cancelled
//!              paused
//! ```
//!
//! [`VALID_TRANSITIONS`] is the only place the edges are written down. The
//! transition engine and state-change notifications both consult it.

use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStatus {
    Created,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

/// Legal successors of every status.
pub static VALID_TRANSITIONS: [(LifecycleStatus, &[LifecycleStatus]); 6] = [
    (LifecycleStatus::Created, &[LifecycleStatus::Running]),
    (
        LifecycleStatus::Running,
        &[
            LifecycleStatus::Paused,
            LifecycleStatus::Completed,
            LifecycleStatus::Failed,
            LifecycleStatus::Cancelled,
        ],
    ),
    (LifecycleStatus::Paused, &[LifecycleStatus::Running]),
    (LifecycleStatus::Completed, &[]),
    (LifecycleStatus::Failed, &[]),
    (LifecycleStatus::Cancelled, &[]),
];

/// Statuses reachable in one step from `current`. A status missing from the
/// table has no legal targets.
pub fn legal_targets(current: LifecycleStatus) -> &'static [LifecycleStatus] {
    VALID_TRANSITIONS
        .iter()
        .find(|(status, _)| *status == current)
        .map(|(_, targets)| *targets)
        .unwrap_or(&[])
}

/// Whether `current -> target` is an edge of the lifecycle graph.
pub fn can_transition(current: LifecycleStatus, target: LifecycleStatus) -> bool {
    legal_targets(current).contains(&target)
}

impl LifecycleStatus {
    pub const ALL: [LifecycleStatus; 6] = [
        LifecycleStatus::Created,
        LifecycleStatus::Running,
        LifecycleStatus::Paused,
        LifecycleStatus::Completed,
        LifecycleStatus::Failed,
        LifecycleStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStatus::Created => "created",
            LifecycleStatus::Running => "running",
            LifecycleStatus::Paused => "paused",
            LifecycleStatus::Completed => "completed",
            LifecycleStatus::Failed => "failed",
            LifecycleStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal statuses have no outgoing edges.
    pub fn is_terminal(&self) -> bool {
        legal_targets(*self).is_empty()
    }

    pub fn can_transition_to(&self, target: LifecycleStatus) -> bool {
        can_transition(*self, target)
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LifecycleStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::Inconsistent {
                field: "status",
                reason: format!("unknown lifecycle status: {s}"),
            })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleStatus::*;

    #[test]
    fn test_created_only_goes_to_running() {
        assert_eq!(legal_targets(Created), &[Running]);
    }

    #[test]
    fn test_running_has_four_targets() {
        assert_eq!(legal_targets(Running).len(), 4);
        for target in [Paused, Completed, Failed, Cancelled] {
            assert!(can_transition(Running, target));
        }
        assert!(!can_transition(Running, Created));
        assert!(!can_transition(Running, Running));
    }

    #[test]
    fn test_paused_can_resume_only() {
        assert_eq!(legal_targets(Paused), &[Running]);
        assert!(!can_transition(Paused, Completed));
    }

    #[test]
    fn test_terminal_states_have_no_transitions() {
        for status in [Completed, Failed, Cancelled] {
            assert!(status.is_terminal());
            assert!(legal_targets(status).is_empty());
            for target in LifecycleStatus::ALL {
                assert!(!can_transition(status, target));
            }
        }
        for status in [Created, Running, Paused] {
            assert!(!status.is_terminal());
        }
    }

    #[test]
    fn test_table_covers_every_status_once() {
        for status in LifecycleStatus::ALL {
            let rows = VALID_TRANSITIONS
                .iter()
                .filter(|(s, _)| *s == status)
                .count();
            assert_eq!(rows, 1, "{status} must appear exactly once");
        }
    }

    #[test]
    fn test_string_forms() {
        for status in LifecycleStatus::ALL {
            assert_eq!(status.as_str().parse::<LifecycleStatus>(), Ok(status));
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::json!(status.as_str())
            );
        }
        assert!("Running".parse::<LifecycleStatus>().is_err());
    }
}
