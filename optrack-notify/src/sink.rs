//! Notification sinks
//!
//! A sink is the transport seam: it receives fully-formed JSON-RPC envelopes
//! and is free to write them to a socket, a channel, or a log.

use crate::{JsonRpcNotification, SinkError};
use std::sync::{Arc, RwLock};

/// Destination for outbound notifications.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: JsonRpcNotification) -> Result<(), SinkError>;
}

impl<S: NotificationSink + ?Sized> NotificationSink for &S {
    fn deliver(&self, notification: JsonRpcNotification) -> Result<(), SinkError> {
        (**self).deliver(notification)
    }
}

impl<S: NotificationSink + ?Sized> NotificationSink for Arc<S> {
    fn deliver(&self, notification: JsonRpcNotification) -> Result<(), SinkError> {
        (**self).deliver(notification)
    }
}

/// In-memory sink that keeps every delivered envelope in order.
///
/// Clones share the same buffer, so one handle can be given to a
/// [`Notifier`](crate::Notifier) while another inspects what arrived.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    delivered: Arc<RwLock<Vec<JsonRpcNotification>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far.
    pub fn delivered(&self) -> Result<Vec<JsonRpcNotification>, SinkError> {
        let delivered = self.delivered.read().map_err(|_| SinkError::LockPoisoned)?;
        Ok(delivered.clone())
    }

    /// Methods of the delivered envelopes, in delivery order.
    pub fn methods(&self) -> Result<Vec<String>, SinkError> {
        let delivered = self.delivered.read().map_err(|_| SinkError::LockPoisoned)?;
        Ok(delivered.iter().map(|n| n.method.clone()).collect())
    }

    pub fn len(&self) -> Result<usize, SinkError> {
        let delivered = self.delivered.read().map_err(|_| SinkError::LockPoisoned)?;
        Ok(delivered.len())
    }

    pub fn is_empty(&self) -> Result<bool, SinkError> {
        Ok(self.len()? == 0)
    }

    /// Drain the buffer.
    pub fn take(&self) -> Result<Vec<JsonRpcNotification>, SinkError> {
        let mut delivered = self.delivered.write().map_err(|_| SinkError::LockPoisoned)?;
        Ok(std::mem::take(&mut *delivered))
    }
}

impl NotificationSink for RecordingSink {
    fn deliver(&self, notification: JsonRpcNotification) -> Result<(), SinkError> {
        let mut delivered = self.delivered.write().map_err(|_| SinkError::LockPoisoned)?;
        delivered.push(notification);
        Ok(())
    }
}
