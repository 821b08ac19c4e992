//! Notifier: projects operation events into envelopes and delivers them.

use crate::{
    CancellationNotification, Envelope, ErrorNotification, Notification, NotificationSink,
    NotifyResult, ProgressNotification, StateChangeNotification,
};
use optrack_core::{
    CancellationToken, Clock, ErrorResponse, LifecycleStatus, OperationId, OperationState,
    OptrackConfig, Payload, ProgressToken, SystemClock, TransitionUpdate, VerbosityMode,
};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Publishes notifications for operations to a [`NotificationSink`].
///
/// Timestamps come from `C`. Progress updates pass through the verbosity
/// filter; the notifier remembers the last stage reported per operation so
/// coarse mode can tell a stage change from an intra-stage update.
#[derive(Debug)]
pub struct Notifier<S, C = SystemClock> {
    sink: S,
    verbosity: VerbosityMode,
    clock: C,
    last_stage: HashMap<OperationId, String>,
}

impl<S: NotificationSink> Notifier<S> {
    pub fn new(sink: S, verbosity: VerbosityMode) -> Self {
        Self::with_clock(sink, verbosity, SystemClock::new())
    }

    /// Verbosity and timestamp precision taken from `config`.
    pub fn from_config(sink: S, config: &OptrackConfig) -> Self {
        Self::with_clock(sink, config.verbosity, config.clock())
    }
}

impl<S: NotificationSink, C: Clock> Notifier<S, C> {
    pub fn with_clock(sink: S, verbosity: VerbosityMode, clock: C) -> Self {
        Self {
            sink,
            verbosity,
            clock,
            last_stage: HashMap::new(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn verbosity(&self) -> VerbosityMode {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: VerbosityMode) {
        self.verbosity = verbosity;
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Stage last reported for `operation_id`, if it is being tracked.
    pub fn current_stage(&self, operation_id: &OperationId) -> Option<&str> {
        self.last_stage.get(operation_id).map(String::as_str)
    }

    /// Wrap `notification` in its envelope and hand it to the sink.
    pub fn publish<N: Notification>(&self, notification: N) -> NotifyResult<()> {
        let operation_id = notification.operation_id().clone();
        let envelope = Envelope::new(notification).to_untyped()?;
        match self.sink.deliver(envelope) {
            Ok(()) => {
                debug!(operation_id = %operation_id, method = N::METHOD, "notification delivered");
                Ok(())
            }
            Err(err) => {
                warn!(
                    operation_id = %operation_id,
                    method = N::METHOD,
                    error = %err,
                    "notification delivery failed"
                );
                Err(err.into())
            }
        }
    }

    /// Filter `notification` by verbosity and publish it if it survives.
    ///
    /// Returns whether anything was delivered. A stage only counts as
    /// reported once its update reaches the sink.
    pub fn progress(&mut self, notification: ProgressNotification) -> NotifyResult<bool> {
        let stage_changed =
            self.current_stage(&notification.operation_id) != Some(notification.stage.as_str());
        let operation_id = notification.operation_id.clone();
        let stage = notification.stage.clone();

        match notification.for_verbosity(self.verbosity, stage_changed) {
            Some(filtered) => {
                self.publish(filtered)?;
                if stage_changed {
                    self.last_stage.insert(operation_id, stage);
                }
                Ok(true)
            }
            None => {
                debug!(verbosity = %self.verbosity, "progress update filtered");
                Ok(false)
            }
        }
    }

    /// Stop tracking `operation_id`. Returns whether it was tracked.
    pub fn forget(&mut self, operation_id: &OperationId) -> bool {
        self.last_stage.remove(operation_id).is_some()
    }

    /// Number of operations whose stage is being tracked.
    pub fn tracked_operations(&self) -> usize {
        self.last_stage.len()
    }

    /// Report the current progress of `state` under `stage`. A terminal
    /// `state` is reported and then forgotten.
    pub fn progress_for<R, P>(
        &mut self,
        state: &OperationState<R, P>,
        progress_token: ProgressToken,
        stage: impl Into<String>,
        message: Option<String>,
    ) -> NotifyResult<bool> {
        let mut notification = ProgressNotification::new(
            state.operation_id().clone(),
            progress_token,
            stage,
            state.progress().clone(),
            self.clock.now(),
        );
        notification.message = message;
        let delivered = self.progress(notification);
        if state.is_terminal() {
            self.forget(state.operation_id());
        }
        delivered
    }

    pub fn cancelled(
        &self,
        operation_id: OperationId,
        cancellation_token: CancellationToken,
    ) -> NotifyResult<()> {
        self.publish(CancellationNotification::new(
            operation_id,
            cancellation_token,
            self.clock.now(),
        ))
    }

    pub fn error(
        &self,
        operation_id: OperationId,
        error: impl Into<ErrorResponse>,
    ) -> NotifyResult<()> {
        self.publish(ErrorNotification::new(operation_id, error, self.clock.now()))
    }

    /// Publish the step from `old` to `new`.
    pub fn state_change<R, P>(
        &mut self,
        old: &OperationState<R, P>,
        new: &OperationState<R, P>,
    ) -> NotifyResult<()> {
        let notification = StateChangeNotification::from_states(old, new, self.clock.now())?;
        if notification.new_state().is_terminal() {
            self.last_stage.remove(notification.operation_id());
        }
        self.publish(notification)
    }

    /// Transition `state` on this notifier's clock and publish the change.
    ///
    /// Fails only if the transition itself is rejected. Once it succeeds the
    /// new state is always returned, together with the delivery outcome; a
    /// failed delivery can be retried with [`state_change`](Self::state_change).
    pub fn transition<R, P>(
        &mut self,
        state: &OperationState<R, P>,
        new_status: LifecycleStatus,
        update: TransitionUpdate<R, P>,
    ) -> NotifyResult<Transitioned<R, P>>
    where
        R: Clone + Payload,
        P: Clone + Payload,
    {
        let next = state.transition_with(&self.clock, new_status, update)?;
        let delivery = self.state_change(state, &next);
        Ok(Transitioned {
            state: next,
            delivery,
        })
    }
}

/// A transition that took effect, and whether its state change was delivered.
#[derive(Debug)]
#[must_use = "the delivery outcome may be an error"]
pub struct Transitioned<R = Value, P = Value> {
    pub state: OperationState<R, P>,
    pub delivery: NotifyResult<()>,
}

impl<R, P> Transitioned<R, P> {
    pub fn is_delivered(&self) -> bool {
        self.delivery.is_ok()
    }

    /// The new state if delivery succeeded, otherwise the delivery error.
    pub fn into_delivered(self) -> NotifyResult<OperationState<R, P>> {
        self.delivery.map(|()| self.state)
    }
}
