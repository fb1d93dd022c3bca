//! Item store: keyed collection of committed work items.

use std::collections::HashMap;
use std::time::Instant;

use tracing::debug;

use crate::item::QueueItem;
use crate::observability::QueueStats;
use crate::queue::record::ItemRecord;

/// Keyed collection of stored items, one record per id.
///
/// The store enforces the overwrite invariant: committing an id that is
/// already stored replaces the record only when the incoming timestamp
/// is strictly newer. Capacity is enforced one level up, where armed
/// debounce entries also count against the bound.
#[derive(Debug, Default)]
pub struct ItemStore {
    records: HashMap<String, ItemRecord>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&ItemRecord> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ItemRecord> {
        self.records.get_mut(id)
    }

    /// Commit an item, applying the overwrite invariant. Returns false
    /// when the update is stale (stored timestamp is not older).
    pub fn commit(&mut self, item: QueueItem) -> bool {
        if let Some(existing) = self.records.get(&item.id)
            && existing.item.timestamp >= item.timestamp
        {
            debug!(id = %item.id, "stale update dropped");
            return false;
        }
        self.records.insert(item.id.clone(), ItemRecord::new(item));
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<ItemRecord> {
        self.records.remove(id)
    }

    /// Drop every record whose id fails the predicate.
    pub fn retain(&mut self, keep: impl Fn(&str) -> bool) {
        self.records.retain(|id, _| keep(id));
    }

    pub fn records(&self) -> impl Iterator<Item = &ItemRecord> {
        self.records.values()
    }

    /// Snapshot of stored items, in unspecified order.
    pub fn items(&self) -> Vec<QueueItem> {
        self.records.values().map(|r| r.item.clone()).collect()
    }

    /// Derive stats over stored records; `processing` is supplied by
    /// the caller because in-flight work may outlive its record.
    pub fn stats(&self, processing: usize) -> QueueStats {
        let now = Instant::now();
        let mut stats = QueueStats {
            total: self.records.len(),
            processing,
            ..QueueStats::default()
        };
        for record in self.records.values() {
            stats.by_priority.bump(record.item.priority);
            stats.by_kind.bump(record.item.kind);
            if record.is_retry_pending(now) {
                stats.waiting_retry += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{OpKind, Priority, TargetKey};
    use chrono::{Duration as ChronoDuration, Utc};

    fn item(id: &str) -> QueueItem {
        QueueItem::new(
            id,
            OpKind::Index,
            TargetKey::new("src", format!("skills/{id}")),
            Priority::Medium,
        )
    }

    #[test]
    fn one_record_per_id() {
        let mut store = ItemStore::new();
        let t0 = Utc::now();
        assert!(store.commit(item("a").with_timestamp(t0)));
        assert!(store.commit(item("a").with_timestamp(t0 + ChronoDuration::milliseconds(5))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn stale_update_is_dropped() {
        let mut store = ItemStore::new();
        let t0 = Utc::now();
        assert!(store.commit(item("a").with_timestamp(t0)));
        // Equal timestamp is stale too: only strictly newer wins.
        assert!(!store.commit(item("a").with_timestamp(t0)));
        assert!(!store.commit(item("a").with_timestamp(t0 - ChronoDuration::seconds(1))));
        let stored = store.get("a").unwrap();
        assert_eq!(stored.item.timestamp, t0);
    }

    #[test]
    fn overwrite_resets_retry_state() {
        let mut store = ItemStore::new();
        let t0 = Utc::now();
        store.commit(item("a").with_timestamp(t0));
        store.get_mut("a").unwrap().record_failure("boom");
        store.commit(item("a").with_timestamp(t0 + ChronoDuration::seconds(1)));
        assert_eq!(store.get("a").unwrap().retries, 0);
    }

    #[test]
    fn stats_break_down_by_priority_and_kind() {
        let mut store = ItemStore::new();
        store.commit(QueueItem::new(
            "a",
            OpKind::Index,
            TargetKey::new("s", "p1"),
            Priority::High,
        ));
        store.commit(QueueItem::new(
            "b",
            OpKind::Remove,
            TargetKey::new("s", "p2"),
            Priority::Low,
        ));
        let stats = store.stats(1);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_priority.high, 1);
        assert_eq!(stats.by_priority.low, 1);
        assert_eq!(stats.by_kind.index, 1);
        assert_eq!(stats.by_kind.remove, 1);
        assert_eq!(stats.processing, 1);
        assert_eq!(stats.waiting_retry, 0);
    }
}
