//! Translation of raw filesystem notifications into reload events.

use notify::event::ModifyKind;
use notify::{Event, EventKind};
use steward_model::{ChangeKind, FileEvent};

/// Maps a notification kind onto a reload-relevant change, dropping pure
/// access notifications and kinds with no classification.
fn classify(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Renamed),
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        EventKind::Remove(_) => Some(ChangeKind::Deleted),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}

/// Converts one notification into zero or more file events, one per path.
///
/// A rescan flag from the backend means events were lost; every affected
/// path is reported as [`ChangeKind::Overflow`] so the whole directory is
/// treated as changed.
pub(super) fn convert(event: &Event) -> Vec<FileEvent> {
    let kind = if event.need_rescan() {
        Some(ChangeKind::Overflow)
    } else {
        classify(&event.kind)
    };
    let Some(kind) = kind else {
        return Vec::new();
    };
    event
        .paths
        .iter()
        .map(|path| FileEvent::new(path.clone(), kind))
        .collect()
}
