//! Verbosity filtering for progress notifications.

use crate::ProgressNotification;
use optrack_core::VerbosityMode;

/// Trim or drop a progress update according to `mode`.
///
/// | Mode     | Intra-stage updates | `message` | `metadata` |
/// |----------|---------------------|-----------|------------|
/// | coarse   | dropped             | stripped  | stripped   |
/// | normal   | kept                | stripped  | stripped   |
/// | fine     | kept                | kept      | stripped   |
/// | debug    | kept                | kept      | kept       |
///
/// Returns `None` when the update should not be delivered.
pub fn filter_progress(
    mut notification: ProgressNotification,
    mode: VerbosityMode,
    stage_changed: bool,
) -> Option<ProgressNotification> {
    if !stage_changed && !mode.includes_intra_stage() {
        return None;
    }
    if !mode.includes_message() {
        notification.message = None;
    }
    if !mode.includes_metadata() {
        notification.metadata = None;
    }
    Some(notification)
}
