//! Lifecycle transition engine
//!
//! A transition never mutates its input. It checks the edge against
//! [`VALID_TRANSITIONS`](crate::VALID_TRANSITIONS), assembles the successor
//! and runs it back through [`OperationState::from_parts`], so the result is
//! either a valid state or an error.

use crate::clock::{Clock, IdSource, SystemClock};
use crate::operation::present;
use crate::{
    can_transition, legal_targets, ErrorResponse, LifecycleStatus, OperationState, OptrackResult,
    Payload, ProgressMetrics, Timestamp, TransitionError,
};
use serde_json::Value;
use tracing::debug;

/// Fields a transition may supply. Anything left `None` (or an absent
/// payload such as JSON `null`) keeps the prior value, except `end_time`
/// which is recomputed from the target status.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionUpdate<R = Value, P = Value> {
    pub end_time: Option<Timestamp>,
    pub result: Option<R>,
    pub error: Option<ErrorResponse>,
    pub partial_results: Option<P>,
    pub progress: Option<ProgressMetrics>,
}

impl<R, P> Default for TransitionUpdate<R, P> {
    fn default() -> Self {
        Self {
            end_time: None,
            result: None,
            error: None,
            partial_results: None,
            progress: None,
        }
    }
}

impl<R, P> TransitionUpdate<R, P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit end time. Only honoured when the target is terminal.
    pub fn with_end_time(mut self, end_time: Timestamp) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn with_result(mut self, result: R) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_error(mut self, error: impl Into<ErrorResponse>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_partial_results(mut self, partial_results: P) -> Self {
        self.partial_results = Some(partial_results);
        self
    }

    pub fn with_progress(mut self, progress: ProgressMetrics) -> Self {
        self.progress = Some(progress);
        self
    }
}

impl<R: Clone + Payload, P: Clone + Payload> OperationState<R, P> {
    /// Advance to `new_status`, stamping terminal end times from the system clock.
    pub fn transition(
        &self,
        new_status: LifecycleStatus,
        update: TransitionUpdate<R, P>,
    ) -> OptrackResult<Self> {
        self.transition_with(&SystemClock::new(), new_status, update)
    }

    /// Advance to `new_status` using `clock` for a missing terminal end time.
    pub fn transition_with(
        &self,
        clock: &impl Clock,
        new_status: LifecycleStatus,
        update: TransitionUpdate<R, P>,
    ) -> OptrackResult<Self> {
        let from = self.status();
        if !can_transition(from, new_status) {
            debug!(
                operation_id = %self.operation_id(),
                from = %from,
                to = %new_status,
                "transition rejected"
            );
            return Err(TransitionError::InvalidTransition {
                from,
                to: new_status,
                allowed: legal_targets(from).to_vec(),
            }
            .into());
        }

        let end_time = if new_status.is_terminal() {
            Some(update.end_time.unwrap_or_else(|| clock.now()))
        } else {
            None
        };

        let mut parts = self.clone().into_parts();
        parts.status = new_status;
        parts.end_time = end_time;
        parts.result = present(update.result).or(parts.result);
        parts.error = update.error.or(parts.error);
        parts.partial_results = present(update.partial_results).or(parts.partial_results);
        parts.progress = update.progress.unwrap_or(parts.progress);

        let next = Self::from_parts(parts)?;
        debug!(
            operation_id = %next.operation_id(),
            from = %from,
            to = %new_status,
            "operation transitioned"
        );
        Ok(next)
    }
}

/// Free-function form of [`OperationState::transition`].
pub fn transition<R: Clone + Payload, P: Clone + Payload>(
    state: &OperationState<R, P>,
    new_status: LifecycleStatus,
    update: TransitionUpdate<R, P>,
) -> OptrackResult<OperationState<R, P>> {
    state.transition(new_status, update)
}

/// A `created` operation with a generated id and the current start time.
/// Progress defaults to zero with no known total.
pub fn create_operation(
    tool_name: impl Into<String>,
    progress: Option<ProgressMetrics>,
) -> OperationState {
    let clock = SystemClock::new();
    create_operation_with(&clock, &clock, tool_name, progress)
}

/// [`create_operation`] with explicit id and time sources.
pub fn create_operation_with<R, P>(
    ids: &impl IdSource,
    clock: &impl Clock,
    tool_name: impl Into<String>,
    progress: Option<ProgressMetrics>,
) -> OperationState<R, P> {
    let state = OperationState::new(
        ids.operation_id(),
        tool_name,
        clock.now(),
        progress.unwrap_or_default(),
    );
    debug!(
        operation_id = %state.operation_id(),
        tool_name = state.tool_name(),
        "operation created"
    );
    state
}

// =============================================================================
// TESTS
// =============================================================================
