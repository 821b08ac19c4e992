//! optrack core - Operation Lifecycle Types
//!
//! Shared data contract for long-running, cancellable, resumable operations.
//! Every type here is an immutable value that is validated when it is built
//! or parsed, so holding one means its invariants hold.
//!
//! # Key Types
//!
//! - `OperationState<R, P>`: an operation's status, timing, progress and outcome
//! - `LifecycleStatus` + `VALID_TRANSITIONS`: the lifecycle graph
//! - `ProgressMetrics`: bounded progress with a percentage consistency check
//! - `CancellationToken`: the cancellation handshake
//! - `ErrorResponse`, `ConnectionError`, `AuthError`, `QueryError`: domain
//!   error records partitioned by code range
//! - `Checkpoint<D>`, `ResumeCapability<D>`: resume snapshots
//!
//! # Lifecycle
//!
//! ```text
//! create_operation ──→ created ──→ running ⇄ paused
//!                                     │
//!                                     └──→ completed | failed | cancelled
//! ```
//!
//! Transitions go through [`OperationState::transition`] (or
//! [`OperationState::transition_with`] with an explicit [`clock::Clock`]),
//! which returns a new state and never mutates its input.
//!
//! # Wire Format
//!
//! Output keys are camelCase; input accepts camelCase or snake_case. Absent
//! optional fields are omitted.

mod cancellation;
mod checkpoint;
pub mod clock;
mod config;
mod error;
mod error_response;
mod identity;
mod lifecycle;
mod operation;
mod progress;
mod transition;
pub mod validation;

pub use cancellation::{
    CancellationReason, CancellationSource, CancellationToken, CancellationTokenParts,
};
pub use checkpoint::{Checkpoint, ResumeCapability};
pub use clock::{
    generate_operation_id, generate_progress_token, generate_timestamp, generate_uuid, Clock,
    FixedClock, IdSource, SystemClock,
};
pub use config::{OptrackConfig, VerbosityMode, ENV_TIMESTAMP_PRECISION, ENV_VERBOSITY};
pub use error::{ConfigError, OptrackError, OptrackResult, TransitionError, ValidationError};
pub use error_response::{
    AuthError, ConnectionError, ErrorContext, ErrorDomain, ErrorResponse, ErrorResponseBuilder,
    ErrorResponseParts, QueryError, ERROR_CODE_RANGE,
};
pub use identity::{
    OperationId, ProgressToken, Timestamp, TimestampPrecision, UuidString, OPERATION_ID_PATTERN,
    PROGRESS_TOKEN_PATTERN, TIMESTAMP_PATTERN, UUID_PATTERN,
};
pub use lifecycle::{can_transition, legal_targets, LifecycleStatus, VALID_TRANSITIONS};
pub use operation::{OperationState, OperationStateParts, Payload};
pub use progress::{
    ProgressMetrics, ProgressMetricsParts, DEFAULT_PROGRESS_UNIT, PERCENTAGE_TOLERANCE,
};
pub use transition::{create_operation, create_operation_with, transition, TransitionUpdate};
