//! Fuzz test for notification envelopes
//!
//! Arbitrary bytes go through `AnyNotification::parse`. It must never panic,
//! and every accepted envelope must round-trip with the same method.
//!
//! Run with: cargo +nightly fuzz run envelope_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use optrack_notify::AnyNotification;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(notification) = AnyNotification::parse(input) else {
        return;
    };

    let text = serde_json::to_string(&notification).expect("parsed envelope serializes");
    let again = AnyNotification::parse(&text).expect("serialized envelope parses");
    assert_eq!(again.method(), notification.method());
    assert_eq!(again.operation_id(), notification.operation_id());
});
