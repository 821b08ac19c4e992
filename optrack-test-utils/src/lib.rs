//! optrack Test Utilities
//!
//! Shared test infrastructure for the optrack workspace:
//! - Proptest generators for every contract type
//! - Fixtures pinned to fixed identifiers and a frozen clock
//! - Assertions for lifecycle invariants and wire round-trips
//! - A tracing subscriber for tests

pub use optrack_core::{
    AuthError, CancellationReason, CancellationSource, CancellationToken, ConnectionError,
    ErrorContext, ErrorDomain, ErrorResponse, ErrorResponseParts, FixedClock, LifecycleStatus,
    OperationId, OperationState, OperationStateParts, OptrackError, OptrackResult,
    ProgressMetrics, ProgressToken, QueryError, Timestamp, TimestampPrecision, TransitionError,
    TransitionUpdate, ValidationError,
};

use serde_json::Value;

// ============================================================================
// TRACING
// ============================================================================

/// Install a test-friendly subscriber once. Honours `RUST_LOG`, otherwise
/// logs optrack crates at debug.
pub fn init_test_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("optrack_core=debug,optrack_notify=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// ============================================================================
// KEY CASING
// ============================================================================

/// `operationId` -> `operation_id`.
pub fn camel_to_snake(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Rewrite every object key in `value` to snake_case, recursively.
pub fn to_snake_case_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (camel_to_snake(k), to_snake_case_keys(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(to_snake_case_keys).collect()),
        other => other.clone(),
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for optrack types.
    //!
    //! Object keys inside generated payloads and context extras are lowercase
    //! single words, so a snake_case rewrite of a serialized value leaves them
    //! untouched.

    use super::*;
    use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
    use proptest::prelude::*;
    use uuid::Uuid;

    // === Identity Generators ===

    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    pub fn arb_operation_id() -> impl Strategy<Value = OperationId> {
        arb_uuid().prop_map(OperationId::from_uuid)
    }

    pub fn arb_progress_token() -> impl Strategy<Value = ProgressToken> {
        arb_uuid().prop_map(ProgressToken::from_uuid)
    }

    /// An instant between 2020 and 2030, millisecond resolution.
    pub fn arb_datetime() -> impl Strategy<Value = DateTime<Utc>> {
        (1577836800i64..1893456000i64, 0u32..1000).prop_map(|(secs, millis)| {
            DateTime::from_timestamp(secs, millis * 1_000_000).unwrap_or_else(Utc::now)
        })
    }

    pub fn arb_precision() -> impl Strategy<Value = TimestampPrecision> {
        prop_oneof![
            Just(TimestampPrecision::Seconds),
            Just(TimestampPrecision::Millis),
        ]
    }

    /// A `Z`-suffixed timestamp.
    pub fn arb_utc_timestamp() -> impl Strategy<Value = Timestamp> {
        (arb_datetime(), arb_precision())
            .prop_map(|(instant, precision)| Timestamp::from_datetime(instant, precision))
    }

    /// A timestamp carrying a whole-hour offset such as `+05:00`.
    pub fn arb_offset_timestamp() -> impl Strategy<Value = Timestamp> {
        (arb_datetime(), -12i32..=14).prop_filter_map("representable offset", |(instant, hours)| {
            let offset = FixedOffset::east_opt(hours * 3600)?;
            let text = instant
                .with_timezone(&offset)
                .to_rfc3339_opts(SecondsFormat::Secs, true);
            Timestamp::parse(text).ok()
        })
    }

    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        prop_oneof![3 => arb_utc_timestamp(), 1 => arb_offset_timestamp()]
    }

    // === Enum Generators ===

    pub fn arb_lifecycle_status() -> impl Strategy<Value = LifecycleStatus> {
        prop::sample::select(LifecycleStatus::ALL.to_vec())
    }

    /// A sequence of requested targets for random lifecycle walks.
    pub fn arb_status_path() -> impl Strategy<Value = Vec<LifecycleStatus>> {
        prop::collection::vec(arb_lifecycle_status(), 0..16)
    }

    pub fn arb_error_domain() -> impl Strategy<Value = ErrorDomain> {
        prop::sample::select(ErrorDomain::ALL.to_vec())
    }

    pub fn arb_cancellation_reason() -> impl Strategy<Value = CancellationReason> {
        prop_oneof![
            Just(CancellationReason::UserRequested),
            Just(CancellationReason::Timeout),
            Just(CancellationReason::ResourceLimit),
            Just(CancellationReason::ErrorThreshold),
        ]
    }

    pub fn arb_cancellation_source() -> impl Strategy<Value = CancellationSource> {
        prop_oneof![
            Just(CancellationSource::Client),
            Just(CancellationSource::Server),
        ]
    }

    // === Payload Generators ===

    pub fn arb_json_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-z ]{0,12}".prop_map(Value::from),
        ]
    }

    /// A non-null JSON payload.
    pub fn arb_payload() -> impl Strategy<Value = Value> {
        prop_oneof![
            arb_json_scalar(),
            prop::collection::vec(arb_json_scalar(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", arb_json_scalar(), 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    }

    /// Any JSON payload, `null` included.
    pub fn arb_nullable_payload() -> impl Strategy<Value = Value> {
        prop_oneof![
            1 => Just(Value::Null),
            3 => arb_payload(),
        ]
    }

    // === Composite Generators ===

    /// Metrics that pass validation: either derived from counts or with an
    /// unknown total.
    pub fn arb_progress_metrics() -> impl Strategy<Value = ProgressMetrics> {
        let counted = (1i64..10_000)
            .prop_flat_map(|total| (0..=total, Just(total)))
            .prop_filter_map("consistent counts", |(current, total)| {
                ProgressMetrics::from_counts(current, total).ok()
            });
        let open = (0i64..10_000, 0.0f64..=100.0).prop_filter_map(
            "valid open-ended progress",
            |(current, percentage)| ProgressMetrics::new(current, None, percentage).ok(),
        );
        (prop_oneof![counted, open], "[a-z]{1,10}")
            .prop_map(|(metrics, unit)| metrics.with_unit(unit))
    }

    pub fn arb_cancellation_token() -> impl Strategy<Value = CancellationToken> {
        prop_oneof![
            Just(CancellationToken::inactive()),
            (
                arb_cancellation_reason(),
                arb_cancellation_source(),
                arb_timestamp()
            )
                .prop_map(|(reason, source, ts)| CancellationToken::requested(reason, source, ts)),
        ]
    }

    pub fn arb_error_context() -> impl Strategy<Value = ErrorContext> {
        (
            proptest::option::of("[a-z_]{1,16}"),
            proptest::option::of("[a-z]{1,10}"),
            proptest::option::of(0u64..10),
            prop::collection::btree_map("[a-z]{1,8}", arb_json_scalar(), 0..3),
        )
            .prop_map(|(operation, stage, retries_attempted, extra)| ErrorContext {
                operation,
                stage,
                retries_attempted,
                extra: extra
                    .into_iter()
                    .filter(|(key, _)| key != "operation" && key != "stage")
                    .collect(),
            })
    }

    pub fn arb_error_parts(
        codes: std::ops::RangeInclusive<i32>,
    ) -> impl Strategy<Value = ErrorResponseParts> {
        (
            codes,
            "[a-z][a-z ]{0,30}",
            proptest::option::of(arb_error_context()),
            proptest::option::of("[A-Za-z ]{1,30}"),
            proptest::option::of(prop::collection::vec("[a-z_:.]{1,20}", 1..4)),
            arb_timestamp(),
        )
            .prop_map(
                |(code, message, context, suggestion, trace, timestamp)| ErrorResponseParts {
                    code,
                    message,
                    context,
                    suggestion,
                    trace,
                    timestamp,
                },
            )
    }

    pub fn arb_error_response() -> impl Strategy<Value = ErrorResponse> {
        arb_error_parts(optrack_core::ERROR_CODE_RANGE).prop_filter_map(
            "valid error response",
            |parts| ErrorResponse::from_parts(parts).ok(),
        )
    }

    /// A valid state in any status. Payloads are present exactly where the
    /// status requires them.
    pub fn arb_operation_state() -> impl Strategy<Value = OperationState> {
        (
            arb_lifecycle_status(),
            arb_operation_id(),
            "[a-z_]{1,24}",
            arb_timestamp(),
            arb_timestamp(),
            arb_progress_metrics(),
            arb_payload(),
            arb_error_response(),
            arb_payload(),
        )
            .prop_filter_map(
                "valid operation state",
                |(status, operation_id, tool_name, start, end, progress, result, error, partial)| {
                    OperationState::from_parts(OperationStateParts {
                        operation_id,
                        tool_name,
                        status,
                        start_time: start,
                        end_time: status.is_terminal().then_some(end),
                        progress,
                        result: (status == LifecycleStatus::Completed).then_some(result),
                        error: (status == LifecycleStatus::Failed).then_some(error),
                        partial_results: (status == LifecycleStatus::Cancelled)
                            .then_some(partial),
                    })
                    .ok()
                },
            )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built values pinned to fixed identifiers and times.

    use super::*;
    use optrack_core::clock::IdSource;
    use serde_json::json;
    use std::sync::atomic::{AtomicU64, Ordering};
    use uuid::Uuid;

    pub const OPERATION_ID: &str = "op-123e4567-e89b-12d3-a456-426614174000";
    pub const PROGRESS_TOKEN: &str = "pt-123e4567-e89b-12d3-a456-426614174000";
    pub const START_TIME: &str = "2025-01-15T10:30:00Z";
    pub const END_TIME: &str = "2025-01-15T10:45:00Z";
    pub const TOOL_NAME: &str = "discover_entities";

    pub fn operation_id() -> OperationId {
        OperationId::parse(OPERATION_ID).expect("fixture operation id is valid")
    }

    pub fn progress_token() -> ProgressToken {
        ProgressToken::parse(PROGRESS_TOKEN).expect("fixture progress token is valid")
    }

    pub fn start_time() -> Timestamp {
        Timestamp::parse(START_TIME).expect("fixture start time is valid")
    }

    pub fn end_time() -> Timestamp {
        Timestamp::parse(END_TIME).expect("fixture end time is valid")
    }

    /// Clock frozen at [`START_TIME`].
    pub fn start_clock() -> FixedClock {
        FixedClock::new(start_time())
    }

    /// Clock frozen at [`END_TIME`].
    pub fn end_clock() -> FixedClock {
        FixedClock::new(end_time())
    }

    /// Deterministic ids: 1, 2, 3, ... as UUIDs.
    #[derive(Debug, Default)]
    pub struct SequentialIds {
        next: AtomicU64,
    }

    impl SequentialIds {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl IdSource for SequentialIds {
        fn new_uuid(&self) -> Uuid {
            let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
            Uuid::from_u128(u128::from(n))
        }
    }

    /// Statuses to request, in order, to walk from `created` to `status`.
    pub fn path_to(status: LifecycleStatus) -> &'static [LifecycleStatus] {
        use LifecycleStatus::*;
        match status {
            Created => &[],
            Running => &[Running],
            Paused => &[Running, Paused],
            Completed => &[Running, Completed],
            Failed => &[Running, Failed],
            Cancelled => &[Running, Cancelled],
        }
    }

    pub fn sample_error() -> ErrorResponse {
        ErrorResponse::builder(6001, "Entity discovery failed", end_time())
            .operation(TOOL_NAME)
            .suggestion("Retry in a few seconds")
            .build()
            .expect("fixture error is valid")
    }

    pub fn connection_error() -> ConnectionError {
        ErrorResponse::builder(1001, "Connection refused", end_time())
            .operation("connect")
            .build_as()
            .expect("fixture connection error is valid")
    }

    pub fn auth_error() -> AuthError {
        ErrorResponse::builder(2001, "Token expired", end_time())
            .suggestion("Refresh the access token")
            .build_as()
            .expect("fixture auth error is valid")
    }

    pub fn query_error() -> QueryError {
        ErrorResponse::builder(3001, "Syntax error near 'FROM'", end_time())
            .operation("execute_query")
            .build_as()
            .expect("fixture query error is valid")
    }

    /// A `created` operation with the fixture id and start time.
    pub fn created_operation() -> OperationState {
        OperationState::new(
            operation_id(),
            TOOL_NAME,
            start_time(),
            ProgressMetrics::zero(),
        )
    }

    /// Walk the fixture operation to `status`, supplying whatever the target
    /// requires. Terminal end times come from [`end_clock`].
    pub fn operation_in(status: LifecycleStatus) -> OperationState {
        let clock = end_clock();
        path_to(status)
            .iter()
            .fold(created_operation(), |state, target| {
                let update = match target {
                    LifecycleStatus::Completed => {
                        TransitionUpdate::new().with_result(json!({"entities": 42}))
                    }
                    LifecycleStatus::Failed => TransitionUpdate::new().with_error(sample_error()),
                    LifecycleStatus::Cancelled => {
                        TransitionUpdate::new().with_partial_results(json!({"entities": 17}))
                    }
                    _ => TransitionUpdate::new(),
                };
                state
                    .transition_with(&clock, *target, update)
                    .expect("fixture path follows legal transitions")
            })
    }

    pub fn running_operation() -> OperationState {
        operation_in(LifecycleStatus::Running)
    }

    pub fn completed_operation() -> OperationState {
        operation_in(LifecycleStatus::Completed)
    }

    pub fn failed_operation() -> OperationState {
        operation_in(LifecycleStatus::Failed)
    }

    pub fn cancelled_operation() -> OperationState {
        operation_in(LifecycleStatus::Cancelled)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for optrack-specific validation.

    use super::*;
    use serde::de::DeserializeOwned;
    use serde::Serialize;
    use std::fmt::Debug;

    #[track_caller]
    pub fn assert_ok<T: Debug>(result: &OptrackResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    #[track_caller]
    pub fn assert_err<T: Debug>(result: &OptrackResult<T>) {
        assert!(result.is_err(), "Expected Err, got Ok: {:?}", result);
    }

    #[track_caller]
    pub fn assert_validation_error<T: Debug>(result: &OptrackResult<T>) {
        match result {
            Err(OptrackError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_invalid_transition<T: Debug>(
        result: &OptrackResult<T>,
        from: LifecycleStatus,
        to: LifecycleStatus,
    ) {
        match result {
            Err(OptrackError::Transition(TransitionError::InvalidTransition {
                from: f, to: t, ..
            })) => {
                assert_eq!((*f, *t), (from, to), "Wrong edge in InvalidTransition");
            }
            other => panic!("Expected InvalidTransition {from} -> {to}, got: {:?}", other),
        }
    }

    /// Check the cross-field rules every state must satisfy.
    #[track_caller]
    pub fn assert_state_invariants<R: Debug, P: Debug>(state: &OperationState<R, P>) {
        let status = state.status();
        assert_eq!(
            status.is_terminal(),
            state.end_time().is_some(),
            "terminal status must coincide with endTime: {:?}",
            state
        );
        if status == LifecycleStatus::Failed {
            assert!(state.error().is_some(), "failed state without error");
        }
        if status == LifecycleStatus::Cancelled {
            assert!(
                state.partial_results().is_some(),
                "cancelled state without partialResults"
            );
        }
    }

    /// Serialize, parse back, and serialize again. The parsed value must equal
    /// the original and both serializations must match. The snake_case form
    /// of the output must parse to the same value.
    #[track_caller]
    pub fn assert_wire_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + Debug,
    {
        let wire = serde_json::to_value(value).expect("serialize");
        let parsed: T = serde_json::from_value(wire.clone()).expect("parse camelCase");
        assert_eq!(&parsed, value, "camelCase round-trip changed the value");

        let again = serde_json::to_value(&parsed).expect("re-serialize");
        assert_eq!(again, wire, "re-serialization is not idempotent");

        let snake: T =
            serde_json::from_value(to_snake_case_keys(&wire)).expect("parse snake_case");
        assert_eq!(&snake, value, "snake_case input parsed differently");
    }

    #[track_caller]
    pub fn assert_percentage_consistent(progress: &ProgressMetrics) {
        if let Some(total) = progress.total().filter(|t| *t > 0) {
            let expected = progress.current() as f64 / total as f64 * 100.0;
            assert!(
                (progress.percentage() - expected).abs() <= optrack_core::PERCENTAGE_TOLERANCE,
                "percentage {} inconsistent with {}/{}",
                progress.percentage(),
                progress.current(),
                total
            );
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
