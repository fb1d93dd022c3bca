//! Priority selector: pure scoring over stored records.

use std::collections::HashSet;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::queue::record::ItemRecord;
use crate::queue::store::ItemStore;

/// The multiplier keeps priority strictly dominant: age only breaks
/// ties within one priority class and can never promote a low-priority
/// item above a high-priority one.
const PRIORITY_WEIGHT_SCALE: i64 = 1000;

fn score(record: &ItemRecord, now: DateTime<Utc>) -> i64 {
    let age_minutes = now
        .signed_duration_since(record.item.timestamp)
        .num_minutes()
        .max(0);
    record.item.priority.weight() * PRIORITY_WEIGHT_SCALE + age_minutes
}

/// Pick the next dispatchable record: not in flight, no future-dated
/// retry delay, maximum score. Ties fall to iteration order, which is
/// deliberately unspecified beyond priority + age.
pub fn select_next<'a>(
    store: &'a ItemStore,
    processing: &HashSet<String>,
    now: DateTime<Utc>,
    mono_now: Instant,
) -> Option<&'a ItemRecord> {
    store
        .records()
        .filter(|r| !processing.contains(&r.item.id))
        .filter(|r| !r.is_retry_pending(mono_now))
        .max_by_key(|r| score(r, now))
}

/// Earliest future retry deadline among idle records, for the
/// dispatcher's timed wait. None means nothing is waiting out a delay.
pub fn next_retry_wakeup(store: &ItemStore, processing: &HashSet<String>) -> Option<Instant> {
    let now = Instant::now();
    store
        .records()
        .filter(|r| !processing.contains(&r.item.id))
        .filter_map(|r| r.next_retry_at)
        .filter(|at| *at > now)
        .min()
}
