use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::info;
use tracing_subscriber::EnvFilter;

use spool_core::{
    EventQueue, OpKind, Priority, ProcessError, Processor, QueueConfig, QueueItem, TargetKey,
};

/// Demo processor: pretends to re-index a skill, failing the first
/// couple of calls to show the backoff path.
struct IndexProcessor {
    remaining_failures: AtomicU32,
}

impl IndexProcessor {
    fn new(failures: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(failures),
        }
    }
}

#[async_trait]
impl Processor for IndexProcessor {
    async fn process(&self, item: &QueueItem) -> Result<(), ProcessError> {
        sleep(Duration::from_millis(50)).await;

        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(ProcessError::new(format!("intentional failure (left={left})")));
        }

        info!(id = %item.id, kind = %item.kind, target = %item.target, "indexed");
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // (A) Build the queue: short windows so the demo finishes quickly.
    let queue = EventQueue::builder()
        .config(QueueConfig {
            concurrency: 2,
            debounce: Duration::from_millis(200),
            max_retries: 3,
            retry_delay: Duration::from_millis(100),
            ..QueueConfig::default()
        })
        .processor(IndexProcessor::new(2))
        .on_processed(|event| {
            info!(
                id = %event.id,
                success = event.success,
                retries = event.retries,
                duration_ms = event.duration.as_millis() as u64,
                "processed"
            );
        })
        .build();

    // (B) A burst of edits to the same skill collapses to one unit of work.
    let target = TargetKey::new("marketplace", "skills/hello/SKILL.md");
    for _ in 0..3 {
        queue
            .add(QueueItem::new("skill-hello", OpKind::Index, target.clone(), Priority::Medium))
            .await;
        sleep(Duration::from_millis(20)).await;
    }

    // (C) An urgent removal skips its debounce window entirely.
    queue
        .add_immediate(QueueItem::new(
            "skill-legacy",
            OpKind::Remove,
            TargetKey::new("marketplace", "skills/legacy/SKILL.md"),
            Priority::High,
        ))
        .await;

    // (D) Let the debounce window elapse, then drain.
    sleep(Duration::from_millis(300)).await;
    queue.wait_for_processing().await;

    // Retries may still be parked; drain until the backlog is gone.
    while queue.has_pending_items().await {
        sleep(Duration::from_millis(50)).await;
        queue.wait_for_processing().await;
    }

    let stats = queue.stats().await;
    info!(stats = %serde_json::to_string(&stats).unwrap_or_default(), "final stats");
}
