//! Notification records
//!
//! Flat, read-only projections of operation events. Each pairs an
//! `operationId` with a payload and a `timestamp`.

use crate::verbosity::filter_progress;
use optrack_core::{
    can_transition, legal_targets, CancellationToken, ErrorResponse, LifecycleStatus, OperationId,
    OperationState, OptrackError, OptrackResult, ProgressMetrics, ProgressToken, Timestamp,
    TransitionError, ValidationError, VerbosityMode,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// PROGRESS
// ============================================================================

/// Progress update for one stage of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ProgressNotification {
    #[serde(alias = "operation_id")]
    pub operation_id: OperationId,
    #[serde(alias = "progress_token")]
    pub progress_token: ProgressToken,
    pub stage: String,
    pub progress: ProgressMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub metadata: Option<Map<String, Value>>,
    pub timestamp: Timestamp,
}

impl ProgressNotification {
    pub fn new(
        operation_id: OperationId,
        progress_token: ProgressToken,
        stage: impl Into<String>,
        progress: ProgressMetrics,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            operation_id,
            progress_token,
            stage: stage.into(),
            progress,
            message: None,
            metadata: None,
            timestamp,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Apply `mode` to this update. See [`filter_progress`].
    pub fn for_verbosity(self, mode: VerbosityMode, stage_changed: bool) -> Option<Self> {
        filter_progress(self, mode, stage_changed)
    }
}

// ============================================================================
// CANCELLATION / ERROR
// ============================================================================

/// Cancellation was requested for an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CancellationNotification {
    #[serde(alias = "operation_id")]
    pub operation_id: OperationId,
    #[serde(alias = "cancellation_token")]
    pub cancellation_token: CancellationToken,
    pub timestamp: Timestamp,
}

impl CancellationNotification {
    pub fn new(
        operation_id: OperationId,
        cancellation_token: CancellationToken,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            operation_id,
            cancellation_token,
            timestamp,
        }
    }
}

/// An operation reported an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ErrorNotification {
    #[serde(alias = "operation_id")]
    pub operation_id: OperationId,
    pub error: ErrorResponse,
    pub timestamp: Timestamp,
}

impl ErrorNotification {
    pub fn new(
        operation_id: OperationId,
        error: impl Into<ErrorResponse>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            operation_id,
            error: error.into(),
            timestamp,
        }
    }
}

// ============================================================================
// STATE CHANGE
// ============================================================================

/// An operation moved between lifecycle statuses.
///
/// The edge is checked against the lifecycle table whenever one of these is
/// built or parsed, independently of the transition that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", try_from = "StateChangeNotificationParts")]
pub struct StateChangeNotification {
    operation_id: OperationId,
    old_state: LifecycleStatus,
    new_state: LifecycleStatus,
    timestamp: Timestamp,
}

/// Unvalidated form of [`StateChangeNotification`]; also the inbound wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChangeNotificationParts {
    #[serde(alias = "operation_id")]
    pub operation_id: OperationId,
    #[serde(alias = "old_state")]
    pub old_state: LifecycleStatus,
    #[serde(alias = "new_state")]
    pub new_state: LifecycleStatus,
    pub timestamp: Timestamp,
}

impl StateChangeNotification {
    pub fn new(
        operation_id: OperationId,
        old_state: LifecycleStatus,
        new_state: LifecycleStatus,
        timestamp: Timestamp,
    ) -> OptrackResult<Self> {
        Self::from_parts(StateChangeNotificationParts {
            operation_id,
            old_state,
            new_state,
            timestamp,
        })
    }

    pub fn from_parts(parts: StateChangeNotificationParts) -> OptrackResult<Self> {
        if !can_transition(parts.old_state, parts.new_state) {
            return Err(TransitionError::InvalidTransition {
                from: parts.old_state,
                to: parts.new_state,
                allowed: legal_targets(parts.old_state).to_vec(),
            }
            .into());
        }
        Ok(Self {
            operation_id: parts.operation_id,
            old_state: parts.old_state,
            new_state: parts.new_state,
            timestamp: parts.timestamp,
        })
    }

    /// Project the step from `old` to `new`. Both must describe the same
    /// operation.
    pub fn from_states<R, P>(
        old: &OperationState<R, P>,
        new: &OperationState<R, P>,
        timestamp: Timestamp,
    ) -> OptrackResult<Self> {
        if old.operation_id() != new.operation_id() {
            return Err(ValidationError::Inconsistent {
                field: "operationId",
                reason: format!(
                    "states belong to different operations: {} vs {}",
                    old.operation_id(),
                    new.operation_id()
                ),
            }
            .into());
        }
        Self::new(
            new.operation_id().clone(),
            old.status(),
            new.status(),
            timestamp,
        )
    }

    pub fn operation_id(&self) -> &OperationId {
        &self.operation_id
    }

    pub fn old_state(&self) -> LifecycleStatus {
        self.old_state
    }

    pub fn new_state(&self) -> LifecycleStatus {
        self.new_state
    }

    pub fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }
}

impl TryFrom<StateChangeNotificationParts> for StateChangeNotification {
    type Error = OptrackError;

    fn try_from(parts: StateChangeNotificationParts) -> Result<Self, Self::Error> {
        Self::from_parts(parts)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use optrack_core::{CancellationReason, CancellationSource, TransitionUpdate};
    use serde_json::json;

    const OP_ID: &str = "op-123e4567-e89b-12d3-a456-426614174000";
    const OTHER_OP_ID: &str = "op-223e4567-e89b-12d3-a456-426614174000";
    const PT_ID: &str = "pt-123e4567-e89b-12d3-a456-426614174000";
    const TS: &str = "2025-01-15T10:30:00Z";

    fn op_id() -> OperationId {
        OperationId::parse(OP_ID).unwrap()
    }

    fn ts() -> Timestamp {
        Timestamp::parse(TS).unwrap()
    }

    #[test]
    fn test_progress_notification_shape() {
        let n = ProgressNotification::new(
            op_id(),
            ProgressToken::parse(PT_ID).unwrap(),
            "indexing",
            ProgressMetrics::from_counts(1, 4).unwrap(),
            ts(),
        )
        .with_message("1 of 4 files")
        .with_metadata("file", json!("a.rs"));

        assert_eq!(
            serde_json::to_value(&n).unwrap(),
            json!({
                "operationId": OP_ID,
                "progressToken": PT_ID,
                "stage": "indexing",
                "progress": {"current": 1, "total": 4, "unit": "items", "percentage": 25.0},
                "message": "1 of 4 files",
                "metadata": {"file": "a.rs"},
                "timestamp": TS
            })
        );
    }

    #[test]
    fn test_progress_notification_rejects_bad_progress() {
        let result: Result<ProgressNotification, _> = serde_json::from_value(json!({
            "operation_id": OP_ID,
            "progress_token": PT_ID,
            "stage": "indexing",
            "progress": {"current": 25, "total": 100, "percentage": 50.0},
            "timestamp": TS
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_cancellation_notification_accepts_snake_case() {
        let parsed: CancellationNotification = serde_json::from_value(json!({
            "operation_id": OP_ID,
            "cancellation_token": {
                "is_cancellation_requested": true,
                "reason": "timeout",
                "source": "server",
                "timestamp": TS
            },
            "timestamp": TS
        }))
        .unwrap();
        assert_eq!(
            parsed.cancellation_token,
            CancellationToken::requested(CancellationReason::Timeout, CancellationSource::Server, ts())
        );
    }

    #[test]
    fn test_state_change_validates_edge() {
        assert!(StateChangeNotification::new(
            op_id(),
            LifecycleStatus::Running,
            LifecycleStatus::Paused,
            ts()
        )
        .is_ok());

        let err = StateChangeNotification::new(
            op_id(),
            LifecycleStatus::Completed,
            LifecycleStatus::Running,
            ts(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            OptrackError::Transition(TransitionError::InvalidTransition { ref allowed, .. })
                if allowed.is_empty()
        ));
    }

    #[test]
    fn test_state_change_parse_validates_edge() {
        let result: Result<StateChangeNotification, _> = serde_json::from_value(json!({
            "operationId": OP_ID,
            "oldState": "created",
            "newState": "completed",
            "timestamp": TS
        }));
        assert!(result.is_err());

        let parsed: StateChangeNotification = serde_json::from_value(json!({
            "operation_id": OP_ID,
            "old_state": "created",
            "new_state": "running",
            "timestamp": TS
        }))
        .unwrap();
        assert_eq!(parsed.new_state(), LifecycleStatus::Running);
        assert_eq!(
            serde_json::to_value(&parsed).unwrap(),
            json!({
                "operationId": OP_ID,
                "oldState": "created",
                "newState": "running",
                "timestamp": TS
            })
        );
    }

    #[test]
    fn test_from_states() {
        let created: OperationState =
            OperationState::new(op_id(), "t", ts(), ProgressMetrics::zero());
        let running = created
            .transition(LifecycleStatus::Running, TransitionUpdate::new())
            .unwrap();
        let n = StateChangeNotification::from_states(&created, &running, ts()).unwrap();
        assert_eq!(n.old_state(), LifecycleStatus::Created);
        assert_eq!(n.new_state(), LifecycleStatus::Running);

        // Reversed order is not an edge.
        assert!(StateChangeNotification::from_states(&running, &created, ts()).is_err());

        let stranger: OperationState = OperationState::new(
            OperationId::parse(OTHER_OP_ID).unwrap(),
            "t",
            ts(),
            ProgressMetrics::zero(),
        );
        assert!(matches!(
            StateChangeNotification::from_states(&stranger, &running, ts()),
            Err(OptrackError::Validation(ValidationError::Inconsistent { field: "operationId", .. }))
        ));
    }
}
