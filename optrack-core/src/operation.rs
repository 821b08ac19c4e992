//! Operation state
//!
//! `OperationState` is an immutable value. Its fields are private and every
//! constructor goes through one validation point, so a state that breaks an
//! invariant never exists:
//!
//! 1. terminal status (completed, failed, cancelled) <=> `end_time` present
//! 2. failed => `error` present
//! 3. cancelled => `partial_results` present
//!
//! The payload slots `result` and `partial_results` are opaque here; only
//! their presence is checked. They default to `serde_json::Value`, where a
//! JSON `null` counts as absent (see [`Payload`]).

use crate::{
    ErrorResponse, LifecycleStatus, OperationId, OptrackError, OptrackResult, ProgressMetrics,
    Timestamp, ValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

// ============================================================================
// PAYLOAD
// ============================================================================

/// Content of the `result` / `partialResults` slots.
///
/// A payload that `is_absent` is treated exactly like a missing field: it is
/// dropped when a state is built and ignored when a transition merges
/// updates. For `serde_json::Value` that is `null`.
pub trait Payload {
    fn is_absent(&self) -> bool {
        false
    }
}

impl Payload for Value {
    fn is_absent(&self) -> bool {
        self.is_null()
    }
}

impl<T: Payload> Payload for Option<T> {
    fn is_absent(&self) -> bool {
        self.as_ref().map_or(true, Payload::is_absent)
    }
}

impl Payload for String {}
impl Payload for Map<String, Value> {}
impl<T> Payload for Vec<T> {}
impl<K, V> Payload for BTreeMap<K, V> {}
impl<K, V, S> Payload for HashMap<K, V, S> {}

/// `Some` only when the payload is present.
pub(crate) fn present<T: Payload>(payload: Option<T>) -> Option<T> {
    payload.filter(|value| !value.is_absent())
}

/// Current state of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    try_from = "OperationStateParts<R, P>",
    bound(
        serialize = "R: Serialize, P: Serialize",
        deserialize = "R: Deserialize<'de> + Payload, P: Deserialize<'de> + Payload"
    )
)]
pub struct OperationState<R = Value, P = Value> {
    operation_id: OperationId,
    tool_name: String,
    status: LifecycleStatus,
    start_time: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_time: Option<Timestamp>,
    progress: ProgressMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<R>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    partial_results: Option<P>,
}

/// Unvalidated form of [`OperationState`]; also the inbound wire shape.
///
/// A JSON `null` payload reads as absent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(
    rename_all = "camelCase",
    bound(deserialize = "R: Deserialize<'de>, P: Deserialize<'de>")
)]
pub struct OperationStateParts<R = Value, P = Value> {
    #[serde(alias = "operation_id")]
    pub operation_id: OperationId,
    #[serde(alias = "tool_name")]
    pub tool_name: String,
    pub status: LifecycleStatus,
    #[serde(alias = "start_time")]
    pub start_time: Timestamp,
    #[serde(alias = "end_time")]
    pub end_time: Option<Timestamp>,
    pub progress: ProgressMetrics,
    pub result: Option<R>,
    pub error: Option<ErrorResponse>,
    #[serde(alias = "partial_results")]
    pub partial_results: Option<P>,
}

impl<R, P> OperationState<R, P> {
    /// A freshly created operation. Always valid.
    pub fn new(
        operation_id: OperationId,
        tool_name: impl Into<String>,
        start_time: Timestamp,
        progress: ProgressMetrics,
    ) -> Self {
        Self {
            operation_id,
            tool_name: tool_name.into(),
            status: LifecycleStatus::Created,
            start_time,
            end_time: None,
            progress,
            result: None,
            error: None,
            partial_results: None,
        }
    }

    pub fn into_parts(self) -> OperationStateParts<R, P> {
        OperationStateParts {
            operation_id: self.operation_id,
            tool_name: self.tool_name,
            status: self.status,
            start_time: self.start_time,
            end_time: self.end_time,
            progress: self.progress,
            result: self.result,
            error: self.error,
            partial_results: self.partial_results,
        }
    }

    pub fn operation_id(&self) -> &OperationId {
        &self.operation_id
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn status(&self) -> LifecycleStatus {
        self.status
    }

    pub fn start_time(&self) -> &Timestamp {
        &self.start_time
    }

    pub fn end_time(&self) -> Option<&Timestamp> {
        self.end_time.as_ref()
    }

    pub fn progress(&self) -> &ProgressMetrics {
        &self.progress
    }

    pub fn result(&self) -> Option<&R> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&ErrorResponse> {
        self.error.as_ref()
    }

    pub fn partial_results(&self) -> Option<&P> {
        self.partial_results.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

impl<R: Payload, P: Payload> OperationState<R, P> {
    /// Validate every invariant and build the state. Absent payloads are
    /// dropped before the checks run.
    pub fn from_parts(mut parts: OperationStateParts<R, P>) -> OptrackResult<Self> {
        parts.result = present(parts.result);
        parts.partial_results = present(parts.partial_results);
        validate_state(&parts)?;
        Ok(Self {
            operation_id: parts.operation_id,
            tool_name: parts.tool_name,
            status: parts.status,
            start_time: parts.start_time,
            end_time: parts.end_time,
            progress: parts.progress,
            result: parts.result,
            error: parts.error,
            partial_results: parts.partial_results,
        })
    }
}

impl<R: Clone, P: Clone> OperationState<R, P> {
    /// Copy of this state with new progress and the same status.
    pub fn with_progress(&self, progress: ProgressMetrics) -> Self {
        Self {
            progress,
            ..self.clone()
        }
    }
}

impl<R: Payload, P: Payload> TryFrom<OperationStateParts<R, P>> for OperationState<R, P> {
    type Error = OptrackError;

    fn try_from(parts: OperationStateParts<R, P>) -> Result<Self, Self::Error> {
        Self::from_parts(parts)
    }
}

fn validate_state<R, P>(parts: &OperationStateParts<R, P>) -> Result<(), ValidationError> {
    let status = parts.status;
    let mut missing = Vec::new();
    if status.is_terminal() && parts.end_time.is_none() {
        missing.push("endTime");
    }
    if status == LifecycleStatus::Failed && parts.error.is_none() {
        missing.push("error");
    }
    if status == LifecycleStatus::Cancelled && parts.partial_results.is_none() {
        missing.push("partialResults");
    }
    if !missing.is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            fields: missing,
            reason: format!("required when status is '{status}'"),
        });
    }

    if !status.is_terminal() && parts.end_time.is_some() {
        return Err(ValidationError::FieldNotAllowed {
            fields: vec!["endTime"],
            reason: format!("not allowed while status is '{status}'"),
        });
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
