//! The event queue: debounced intake, bounded dispatch, retry handling.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::QueueConfig;
use crate::error::ProcessError;
use crate::item::{QueueItem, TargetKey};
use crate::observability::QueueStats;
use crate::queue::debounce::DebounceTable;
use crate::queue::retry::RetryPolicy;
use crate::queue::select;
use crate::queue::store::ItemStore;
use crate::queue::{ProcessedEvent, ProcessedHook, Processor};

/// How often drain waiters re-check queue state when no completion
/// notification arrives.
const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Mutable queue state. Every mutation is serialized behind one mutex;
/// no lock is ever held across a processor await.
struct QueueState {
    store: ItemStore,
    /// Ids with an in-flight processor call. Kept separate from the
    /// store because `remove()` may delete a record while its call is
    /// still running.
    processing: HashSet<String>,
    debounce: DebounceTable,
    processor: Option<Arc<dyn Processor>>,
    on_processed: Option<ProcessedHook>,
}

struct Inner {
    config: QueueConfig,
    retry: RetryPolicy,
    state: Mutex<QueueState>,
    /// Wakes the dispatcher: new commit, freed slot, or processor bound.
    wake: Notify,
    /// Wakes `wait_for_processing` callers when the in-flight set drains.
    drained: Notify,
}

/// In-process event queue for change notifications.
///
/// Buffers producer notifications, collapses bursts per target key,
/// and hands items to the injected [`Processor`] one at a time per
/// concurrency slot, retrying transient failures with exponential
/// backoff. Entirely in-memory; state does not survive the process.
pub struct EventQueue {
    inner: Arc<Inner>,
    dispatcher: JoinHandle<()>,
}

/// Assembles a queue from config plus optional collaborators
/// (the processor may also be bound later via `set_processor`).
#[derive(Default)]
pub struct EventQueueBuilder {
    config: QueueConfig,
    processor: Option<Arc<dyn Processor>>,
    on_processed: Option<ProcessedHook>,
}

impl EventQueueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn processor(mut self, processor: impl Processor + 'static) -> Self {
        self.processor = Some(Arc::new(processor));
        self
    }

    pub fn on_processed(mut self, hook: impl Fn(ProcessedEvent) + Send + Sync + 'static) -> Self {
        self.on_processed = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> EventQueue {
        let retry = RetryPolicy::new(self.config.retry_delay, self.config.max_retries);
        let inner = Arc::new(Inner {
            config: self.config,
            retry,
            state: Mutex::new(QueueState {
                store: ItemStore::new(),
                processing: HashSet::new(),
                debounce: DebounceTable::new(),
                processor: self.processor,
                on_processed: self.on_processed,
            }),
            wake: Notify::new(),
            drained: Notify::new(),
        });
        let dispatcher = tokio::spawn(dispatch_loop(Arc::clone(&inner)));
        EventQueue { inner, dispatcher }
    }
}

impl EventQueue {
    pub fn builder() -> EventQueueBuilder {
        EventQueueBuilder::new()
    }

    /// Queue with the given config and no processor bound yet; items
    /// are accepted but not dispatched until `set_processor`.
    pub fn new(config: QueueConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Accept a notification into its debounce window. Rapid re-adds
    /// for the same target key reset the window and the newest
    /// notification wins. Returns false on capacity rejection.
    ///
    /// True means "accepted into the window", not "durably queued";
    /// callers needing a synchronous commit use [`add_immediate`].
    ///
    /// [`add_immediate`]: EventQueue::add_immediate
    pub async fn add(&self, item: QueueItem) -> bool {
        let mut state = self.inner.state.lock().await;
        if self.at_capacity(&state, &item) {
            warn!(id = %item.id, target = %item.target, "queue full, rejecting item");
            return false;
        }

        let key = item.target.clone();
        let token = state.debounce.next_token();
        let inner = Arc::clone(&self.inner);
        let delay = self.inner.config.debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            commit_debounced(inner, key, token).await;
        });
        debug!(id = %item.id, target = %item.target, "debounce window armed");
        state.debounce.arm(item, token, handle);
        true
    }

    /// Commit a notification directly, bypassing (and cancelling) any
    /// open debounce window for its target key. Returns false on
    /// capacity rejection; a stale timestamp is a silent no-op.
    pub async fn add_immediate(&self, item: QueueItem) -> bool {
        let committed = {
            let mut state = self.inner.state.lock().await;
            if self.at_capacity(&state, &item) {
                warn!(id = %item.id, target = %item.target, "queue full, rejecting item");
                return false;
            }
            state.debounce.cancel(&item.target);
            state.store.commit(item)
        };
        if committed {
            self.inner.wake.notify_one();
        }
        true
    }

    /// Delete a stored item in any state. Does not cancel an in-flight
    /// processor call, only future dispatch and retries of this id.
    pub async fn remove(&self, id: &str) -> bool {
        let mut state = self.inner.state.lock().await;
        state.store.remove(id).is_some()
    }

    /// Late-bind the processor and start draining the backlog.
    pub async fn set_processor(&self, processor: Arc<dyn Processor>) {
        {
            let mut state = self.inner.state.lock().await;
            state.processor = Some(processor);
        }
        self.inner.wake.notify_one();
    }

    pub async fn stats(&self) -> QueueStats {
        let state = self.inner.state.lock().await;
        state.store.stats(state.processing.len())
    }

    /// Snapshot of stored items, in unspecified order.
    pub async fn items(&self) -> Vec<QueueItem> {
        let state = self.inner.state.lock().await;
        state.store.items()
    }

    /// Anything stored or still inside a debounce window?
    pub async fn has_pending_items(&self) -> bool {
        let state = self.inner.state.lock().await;
        !state.store.is_empty() || !state.debounce.is_empty()
    }

    pub async fn processing_count(&self) -> usize {
        let state = self.inner.state.lock().await;
        state.processing.len()
    }

    /// Cancel all debounce timers and drop every stored item that is
    /// not currently processing; in-flight work finishes naturally.
    pub async fn clear(&self) {
        let mut state = self.inner.state.lock().await;
        state.debounce.clear();
        let processing = state.processing.clone();
        state.store.retain(|id| processing.contains(id));
    }

    /// Block until no processor call is in flight and nothing is
    /// immediately dispatchable. Items parked on a future retry delay
    /// do not hold up the drain.
    pub async fn wait_for_processing(&self) {
        loop {
            {
                let state = self.inner.state.lock().await;
                let dispatchable = state.processor.is_some()
                    && select::select_next(
                        &state.store,
                        &state.processing,
                        Utc::now(),
                        Instant::now(),
                    )
                    .is_some();
                if state.processing.is_empty() && !dispatchable {
                    return;
                }
            }
            tokio::select! {
                _ = self.inner.drained.notified() => {}
                _ = tokio::time::sleep(DRAIN_POLL) => {}
            }
        }
    }

    /// Capacity counts stored records plus armed debounce entries, so
    /// accepted-but-uncommitted notifications cannot overshoot the
    /// bound. Replacing an existing id or re-arming an open window
    /// never grows the count and is always allowed.
    fn at_capacity(&self, state: &QueueState, item: &QueueItem) -> bool {
        if state.store.contains(&item.id) || state.debounce.is_armed(&item.target) {
            return false;
        }
        state.store.len() + state.debounce.len() >= self.inner.config.max_size
    }
}

impl Drop for EventQueue {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

/// A fired debounce timer commits its item, unless a newer timer has
/// superseded it in the meantime (token mismatch).
async fn commit_debounced(inner: Arc<Inner>, key: TargetKey, token: u64) {
    let committed = {
        let mut state = inner.state.lock().await;
        match state.debounce.take_if_current(&key, token) {
            Some(item) => {
                debug!(id = %item.id, target = %key, "debounce window elapsed, committing");
                state.store.commit(item)
            }
            None => false,
        }
    };
    if committed {
        inner.wake.notify_one();
    }
}

enum Wait {
    /// Nothing to do until an external wake-up.
    Notified,
    /// A retry becomes eligible at this deadline (or sooner, if woken).
    Until(Instant),
}

/// The single coordinator: fills free worker slots, then parks. A
/// wake-up while slots are being filled coalesces into the stored
/// `Notify` permit, so re-triggering a running coordinator is a no-op.
async fn dispatch_loop(inner: Arc<Inner>) {
    loop {
        match fill_slots(&inner).await {
            Wait::Notified => inner.wake.notified().await,
            Wait::Until(deadline) => {
                tokio::select! {
                    _ = inner.wake.notified() => {}
                    _ = tokio::time::sleep_until(deadline.into()) => {}
                }
            }
        }
    }
}

async fn fill_slots(inner: &Arc<Inner>) -> Wait {
    let mut state = inner.state.lock().await;
    let Some(processor) = state.processor.clone() else {
        return Wait::Notified;
    };

    while state.processing.len() < inner.config.concurrency {
        let Some(record) =
            select::select_next(&state.store, &state.processing, Utc::now(), Instant::now())
        else {
            break;
        };
        let item = record.item.clone();
        let retries = record.retries;
        debug!(id = %item.id, kind = %item.kind, retries, "dispatching item");
        state.processing.insert(item.id.clone());
        tokio::spawn(run_item(Arc::clone(inner), Arc::clone(&processor), item));
    }

    if state.processing.len() >= inner.config.concurrency {
        // Full house; a finishing worker will wake us.
        return Wait::Notified;
    }
    match select::next_retry_wakeup(&state.store, &state.processing) {
        Some(deadline) => Wait::Until(deadline),
        None => Wait::Notified,
    }
}

/// One worker slot: run the processor, then settle the outcome.
///
/// The processor runs in its own task so a panic surfaces as a
/// JoinError and is settled like any other failure; a single item can
/// never take down the dispatcher.
async fn run_item(inner: Arc<Inner>, processor: Arc<dyn Processor>, item: QueueItem) {
    let started = Instant::now();
    let guarded = {
        let item = item.clone();
        tokio::spawn(async move { processor.process(&item).await })
    };
    let result = match guarded.await {
        Ok(outcome) => outcome,
        Err(join_err) => Err(ProcessError::new(format!("processor panicked: {join_err}"))),
    };
    let duration = started.elapsed();

    let (event, hook) = {
        let mut state = inner.state.lock().await;
        state.processing.remove(&item.id);
        let event = match result {
            Ok(()) => settle_success(&mut state, &item, duration),
            Err(err) => settle_failure(&inner, &mut state, &item, err, duration),
        };
        if state.processing.is_empty() {
            inner.drained.notify_waiters();
        }
        (event, state.on_processed.clone())
    };

    // Emit outside the lock: the hook may call back into the queue.
    if let (Some(event), Some(hook)) = (event, hook) {
        hook(event);
    }
    inner.wake.notify_one();
}

fn settle_success(
    state: &mut QueueState,
    item: &QueueItem,
    duration: Duration,
) -> Option<ProcessedEvent> {
    let retries = state.store.get(&item.id).map_or(0, |r| r.retries);
    state.store.remove(&item.id);
    debug!(id = %item.id, duration_ms = duration.as_millis() as u64, "item processed");
    Some(ProcessedEvent {
        id: item.id.clone(),
        kind: item.kind,
        target: item.target.clone(),
        success: true,
        duration,
        retries,
        error: None,
    })
}

fn settle_failure(
    inner: &Inner,
    state: &mut QueueState,
    item: &QueueItem,
    err: ProcessError,
    duration: Duration,
) -> Option<ProcessedEvent> {
    let Some(record) = state.store.get_mut(&item.id) else {
        debug!(id = %item.id, "item removed while in flight, dropping failure");
        return None;
    };
    record.record_failure(err.message());

    if inner.retry.is_exhausted(record.retries) {
        let retries = record.retries;
        state.store.remove(&item.id);
        warn!(id = %item.id, retries, error = %err, "max retries exceeded, giving up");
        return Some(ProcessedEvent {
            id: item.id.clone(),
            kind: item.kind,
            target: item.target.clone(),
            success: false,
            duration,
            retries,
            error: Some(format!("max retries exceeded: {err}")),
        });
    }

    let delay = inner.retry.next_delay(record.retries);
    record.schedule_retry(Instant::now() + delay);
    warn!(
        id = %item.id,
        retries = record.retries,
        delay_ms = delay.as_millis() as u64,
        error = %err,
        "processing failed, retry scheduled"
    );
    None
}
