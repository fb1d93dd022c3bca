//! Read-only stats view over the item store.

use serde::{Deserialize, Serialize};

use crate::item::{OpKind, Priority};

/// Stored-item counts per priority class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl PriorityCounts {
    pub(crate) fn bump(&mut self, priority: Priority) {
        match priority {
            Priority::High => self.high += 1,
            Priority::Medium => self.medium += 1,
            Priority::Low => self.low += 1,
        }
    }
}

/// Stored-item counts per operation kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    pub index: usize,
    pub remove: usize,
    pub remove_all: usize,
    pub archive: usize,
    pub reactivate: usize,
}

impl KindCounts {
    pub(crate) fn bump(&mut self, kind: OpKind) {
        match kind {
            OpKind::Index => self.index += 1,
            OpKind::Remove => self.remove += 1,
            OpKind::RemoveAll => self.remove_all += 1,
            OpKind::Archive => self.archive += 1,
            OpKind::Reactivate => self.reactivate += 1,
        }
    }
}

/// Snapshot of queue health, purely derived from stored state.
///
/// `processing` counts in-flight processor calls; `waiting_retry`
/// counts stored items whose backoff delay has not yet elapsed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: usize,
    pub by_priority: PriorityCounts,
    pub by_kind: KindCounts,
    pub processing: usize,
    pub waiting_retry: usize,
}
