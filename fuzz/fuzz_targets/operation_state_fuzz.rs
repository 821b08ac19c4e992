//! Fuzz test for operation state parsing
//!
//! Feeds arbitrary bytes to the `OperationState` decoder. Anything that
//! parses must satisfy the entity invariants and re-serialize to a value
//! that parses back identically.
//!
//! Run with: cargo +nightly fuzz run operation_state_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use optrack_core::OperationState;

fuzz_target!(|data: &[u8]| {
    let Ok(state) = serde_json::from_slice::<OperationState>(data) else {
        return;
    };

    assert_eq!(state.is_terminal(), state.end_time().is_some());
    if state.status() == optrack_core::LifecycleStatus::Failed {
        assert!(state.error().is_some());
    }
    if state.status() == optrack_core::LifecycleStatus::Cancelled {
        assert!(state.partial_results().is_some());
    }

    let wire = serde_json::to_value(&state).expect("valid state serializes");
    let again: OperationState =
        serde_json::from_value(wire.clone()).expect("serialized state parses");
    assert_eq!(again, state);
    assert_eq!(serde_json::to_value(&again).expect("re-serialize"), wire);
});
