//! Queue module: item store, debounce timers, selection, and dispatch.

mod debounce;
mod event_queue;
mod record;
mod retry;
mod select;
mod store;

pub use event_queue::{EventQueue, EventQueueBuilder};
pub use record::ItemRecord;
pub use retry::RetryPolicy;
pub use store::ItemStore;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProcessError;
use crate::item::{OpKind, QueueItem, TargetKey};

/// The injected work function, invoked once per dispatched item.
///
/// Design intent:
/// - The queue manages item lifecycle (commit -> dispatch -> remove or retry).
/// - The processor executes side effects and reports the result.
/// - Items are exposed by shared reference to avoid accidental mutation;
///   the queue exclusively owns all stored state.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, item: &QueueItem) -> Result<(), ProcessError>;
}

/// Terminal outcome of one item: emitted on success and on permanent
/// failure. Scheduled-but-not-exhausted retries emit nothing.
#[derive(Debug, Clone)]
pub struct ProcessedEvent {
    pub id: String,
    pub kind: OpKind,
    pub target: TargetKey,
    pub success: bool,
    /// Wall time of the final processor invocation.
    pub duration: Duration,
    /// Failed attempts before this outcome.
    pub retries: u32,
    pub error: Option<String>,
}

/// Outcome callback. Invoked outside the queue's state lock, so it may
/// call back into the queue freely.
pub type ProcessedHook = Arc<dyn Fn(ProcessedEvent) + Send + Sync>;
