//! optrack notify - Notifications for Operation Lifecycles
//!
//! Projects lifecycle events from `optrack-core` into JSON-RPC 2.0
//! notifications and hands them to a transport.
//!
//! # Key Types
//!
//! - `ProgressNotification`, `CancellationNotification`, `ErrorNotification`,
//!   `StateChangeNotification`: the four notification payloads
//! - `Envelope<N>`: a payload wrapped with its fixed method
//! - `AnyNotification`: decode whichever kind an envelope carries
//! - `NotificationSink`: the transport seam; `RecordingSink` keeps envelopes in memory
//! - `Notifier`: filters by verbosity, stamps timestamps, and publishes
//!
//! # Methods
//!
//! ```text
//! notifications/progress      ProgressNotification
//! notifications/cancelled     CancellationNotification
//! notifications/error         ErrorNotification
//! notifications/state_change  StateChangeNotification
//! ```

mod envelope;
mod error;
mod notification;
mod notifier;
mod sink;
pub mod verbosity;

pub use envelope::{
    AnyNotification, Envelope, JsonRpcNotification, JsonRpcVersion, Notification,
    JSONRPC_VERSION, METHOD_CANCELLED, METHOD_ERROR, METHOD_PROGRESS, METHOD_STATE_CHANGE,
};
pub use error::{EnvelopeError, NotifyError, NotifyResult, SinkError};
pub use notification::{
    CancellationNotification, ErrorNotification, ProgressNotification, StateChangeNotification,
    StateChangeNotificationParts,
};
pub use notifier::{Notifier, Transitioned};
pub use sink::{NotificationSink, RecordingSink};
pub use verbosity::filter_progress;
