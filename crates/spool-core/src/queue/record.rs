//! Stored item record: the item plus retry bookkeeping.

use std::time::Instant;

use crate::item::QueueItem;

/// A committed item and its mutable processing state.
///
/// Design:
/// - This is the single source of truth for a stored item.
/// - The in-flight set holds ids only; eligibility is derived from
///   set membership plus `next_retry_at`.
#[derive(Debug, Clone)]
pub struct ItemRecord {
    pub item: QueueItem,

    /// Failed attempts so far. Bounded by the configured maximum;
    /// reaching it is terminal.
    pub retries: u32,

    /// Last failure message, if any.
    pub last_error: Option<String>,

    /// While set and in the future, the item is ineligible for dispatch.
    pub next_retry_at: Option<Instant>,

    /// When the record entered the store.
    pub committed_at: Instant,
}

impl ItemRecord {
    pub fn new(item: QueueItem) -> Self {
        Self {
            item,
            retries: 0,
            last_error: None,
            next_retry_at: None,
            committed_at: Instant::now(),
        }
    }

    /// Count a failed attempt and remember the error.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.retries += 1;
        self.last_error = Some(error.into());
    }

    /// Arm the backoff delay; the item stays stored but ineligible.
    pub fn schedule_retry(&mut self, at: Instant) {
        self.next_retry_at = Some(at);
    }

    /// Is this record waiting out a backoff delay right now?
    pub fn is_retry_pending(&self, now: Instant) -> bool {
        self.next_retry_at.is_some_and(|at| at > now)
    }
}
