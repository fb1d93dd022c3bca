//! Debounce table: per-target delayed-commit timers.

use std::collections::HashMap;

use tokio::task::JoinHandle;

use crate::item::{QueueItem, TargetKey};

struct Pending {
    item: QueueItem,
    token: u64,
    handle: JoinHandle<()>,
}

/// Per-target timer table. At most one notification per target key is
/// in flight for debouncing; arming a key again cancels the previous
/// timer (newest wins).
///
/// Every armed timer carries a token. A firing timer only commits when
/// its token still matches the table entry, which makes the
/// abort-versus-fire race harmless: a stale timer that slips past its
/// abort finds a newer token and gives up.
#[derive(Default)]
pub struct DebounceTable {
    pending: HashMap<TargetKey, Pending>,
    next_token: u64,
}

impl DebounceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_armed(&self, key: &TargetKey) -> bool {
        self.pending.contains_key(key)
    }

    pub fn next_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    /// Install a timer for the item's target, cancelling any existing
    /// one for the same key.
    pub fn arm(&mut self, item: QueueItem, token: u64, handle: JoinHandle<()>) {
        let key = item.target.clone();
        if let Some(old) = self.pending.insert(key, Pending { item, token, handle }) {
            old.handle.abort();
        }
    }

    /// Cancel a key's timer, discarding the pending item. Returns true
    /// when a timer existed.
    pub fn cancel(&mut self, key: &TargetKey) -> bool {
        match self.pending.remove(key) {
            Some(old) => {
                old.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Claim a fired timer's item, but only if the token is still the
    /// newest for the key.
    pub fn take_if_current(&mut self, key: &TargetKey, token: u64) -> Option<QueueItem> {
        match self.pending.get(key) {
            Some(p) if p.token == token => self.pending.remove(key).map(|p| p.item),
            _ => None,
        }
    }

    /// Cancel every timer and drop every pending item.
    pub fn clear(&mut self) {
        for (_, old) in self.pending.drain() {
            old.handle.abort();
        }
    }
}
