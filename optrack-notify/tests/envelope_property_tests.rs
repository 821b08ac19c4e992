//! Property-Based Tests for Notification Envelopes
//!
//! Properties:
//! - Every notification survives an envelope round-trip through
//!   `AnyNotification`, keeping its method and operation id
//! - Notification payloads round-trip in both key casings
//! - A state-change notification can be built exactly for table edges
//! - Coarse verbosity delivers one update per stage run

use optrack_core::{can_transition, LifecycleStatus, VerbosityMode};
use optrack_notify::{
    AnyNotification, CancellationNotification, Envelope, ErrorNotification, Notification,
    Notifier, ProgressNotification, RecordingSink, StateChangeNotification, METHOD_PROGRESS,
};
use optrack_test_utils::assertions::assert_wire_round_trip;
use optrack_test_utils::{fixtures, generators, init_test_tracing};
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// GENERATORS
// ============================================================================

fn arb_stage() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

prop_compose! {
    fn arb_progress_notification()(
        operation_id in generators::arb_operation_id(),
        token in generators::arb_progress_token(),
        stage in arb_stage(),
        progress in generators::arb_progress_metrics(),
        message in proptest::option::of("[a-z ]{0,16}"),
        metadata in proptest::option::of(generators::arb_json_scalar()),
        timestamp in generators::arb_timestamp(),
    ) -> ProgressNotification {
        let mut n = ProgressNotification::new(operation_id, token, stage, progress, timestamp);
        n.message = message;
        if let Some(value) = metadata {
            n = n.with_metadata("detail", value);
        }
        n
    }
}

prop_compose! {
    fn arb_cancellation_notification()(
        operation_id in generators::arb_operation_id(),
        token in generators::arb_cancellation_token(),
        timestamp in generators::arb_timestamp(),
    ) -> CancellationNotification {
        CancellationNotification::new(operation_id, token, timestamp)
    }
}

prop_compose! {
    fn arb_error_notification()(
        operation_id in generators::arb_operation_id(),
        error in generators::arb_error_response(),
        timestamp in generators::arb_timestamp(),
    ) -> ErrorNotification {
        ErrorNotification::new(operation_id, error, timestamp)
    }
}

fn arb_state_change_notification() -> impl Strategy<Value = StateChangeNotification> {
    (
        generators::arb_operation_id(),
        generators::arb_lifecycle_status(),
        generators::arb_lifecycle_status(),
        generators::arb_timestamp(),
    )
        .prop_filter_map("edge must be legal", |(id, from, to, ts)| {
            StateChangeNotification::new(id, from, to, ts).ok()
        })
}

fn arb_any_notification() -> impl Strategy<Value = AnyNotification> {
    prop_oneof![
        arb_progress_notification().prop_map(AnyNotification::Progress),
        arb_cancellation_notification().prop_map(AnyNotification::Cancelled),
        arb_error_notification().prop_map(AnyNotification::Error),
        arb_state_change_notification().prop_map(AnyNotification::StateChange),
    ]
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_any_notification_round_trips(any in arb_any_notification()) {
        let text = serde_json::to_string(&any).unwrap();
        let back = AnyNotification::parse(&text).unwrap();
        prop_assert_eq!(back.method(), any.method());
        prop_assert_eq!(back.operation_id(), any.operation_id());
        prop_assert_eq!(back, any);
    }

    #[test]
    fn prop_progress_payload_round_trips(n in arb_progress_notification()) {
        assert_wire_round_trip(&n);
    }

    #[test]
    fn prop_error_payload_round_trips(n in arb_error_notification()) {
        assert_wire_round_trip(&n);
    }

    #[test]
    fn prop_state_change_matches_table(
        from in generators::arb_lifecycle_status(),
        to in generators::arb_lifecycle_status(),
    ) {
        let built = StateChangeNotification::new(
            fixtures::operation_id(),
            from,
            to,
            fixtures::start_time(),
        );
        prop_assert_eq!(built.is_ok(), can_transition(from, to));
    }

    #[test]
    fn prop_typed_envelope_keeps_method(n in arb_cancellation_notification()) {
        let envelope = Envelope::new(n.clone());
        let wire = serde_json::to_value(&envelope).unwrap();
        prop_assert_eq!(&wire["method"], &json!(CancellationNotification::METHOD));
        prop_assert_eq!(&wire["jsonrpc"], &json!("2.0"));
        let parsed: Envelope<CancellationNotification> = serde_json::from_value(wire).unwrap();
        prop_assert_eq!(parsed.into_params(), n);
    }

    #[test]
    fn prop_coarse_delivers_one_update_per_stage_run(
        stages in proptest::collection::vec(prop_oneof![Just("a"), Just("b"), Just("c")], 1..20),
    ) {
        let sink = RecordingSink::new();
        let mut notifier =
            Notifier::with_clock(sink.clone(), VerbosityMode::Coarse, fixtures::start_clock());
        for stage in &stages {
            notifier
                .progress(ProgressNotification::new(
                    fixtures::operation_id(),
                    fixtures::progress_token(),
                    *stage,
                    optrack_core::ProgressMetrics::zero(),
                    fixtures::start_time(),
                ))
                .unwrap();
        }
        let runs = 1 + stages.windows(2).filter(|w| w[0] != w[1]).count();
        prop_assert_eq!(sink.len().unwrap(), runs);
    }
}

// ============================================================================
// EXAMPLES
// ============================================================================

#[test]
fn test_full_lifecycle_publishes_each_step() {
    init_test_tracing();
    let sink = RecordingSink::new();
    let mut notifier = Notifier::with_clock(sink.clone(), VerbosityMode::Fine, fixtures::end_clock());

    let created = fixtures::created_operation();
    let running = notifier
        .transition(&created, LifecycleStatus::Running, Default::default())
        .unwrap()
        .into_delivered()
        .unwrap();
    assert!(notifier
        .progress_for(&running, fixtures::progress_token(), "discover", Some("starting".into()))
        .unwrap());
    let failed = notifier
        .transition(
            &running,
            LifecycleStatus::Failed,
            optrack_core::TransitionUpdate::new().with_error(fixtures::sample_error()),
        )
        .unwrap()
        .into_delivered()
        .unwrap();
    notifier
        .error(failed.operation_id().clone(), fixtures::sample_error())
        .unwrap();

    assert_eq!(failed.end_time(), Some(&fixtures::end_time()));
    assert_eq!(
        sink.methods().unwrap(),
        vec![
            "notifications/state_change",
            METHOD_PROGRESS,
            "notifications/state_change",
            "notifications/error",
        ]
    );

    let delivered = sink.take().unwrap();
    let progress = match AnyNotification::from_untyped(delivered[1].clone()).unwrap() {
        AnyNotification::Progress(n) => n,
        other => panic!("expected progress, got {other:?}"),
    };
    assert_eq!(progress.message.as_deref(), Some("starting"));
    assert_eq!(progress.timestamp, fixtures::end_time());
}

#[test]
fn test_envelope_wire_example() {
    let wire = json!({
        "jsonrpc": "2.0",
        "method": "notifications/progress",
        "params": {
            "operation_id": fixtures::OPERATION_ID,
            "progress_token": fixtures::PROGRESS_TOKEN,
            "stage": "index",
            "progress": {"current": 25, "total": 100, "percentage": 25.0},
            "timestamp": fixtures::START_TIME
        }
    });
    let parsed = AnyNotification::parse(&wire.to_string()).unwrap();
    assert_eq!(parsed.method(), METHOD_PROGRESS);

    let out = serde_json::to_value(&parsed).unwrap();
    assert_eq!(out["params"]["operationId"], json!(fixtures::OPERATION_ID));
    assert_eq!(out["params"]["progress"]["unit"], json!("items"));
    assert!(out["params"].get("message").is_none());
}
