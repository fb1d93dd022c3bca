//! spool-core
//!
//! In-process event queue for change notifications: buffers bursts of
//! near-duplicate notifications behind per-target debounce windows,
//! dispatches stored items priority-first with bounded concurrency,
//! and retries transient processor failures with exponential backoff.
//! Everything is in-memory; nothing survives the process.
//!
//! # Modules
//! - **item**: the data model (`QueueItem`, `OpKind`, `Priority`, `TargetKey`)
//! - **config**: construction-time settings with defaults
//! - **queue**: store, debounce timers, priority selection, and the
//!   concurrency-bounded dispatcher (`EventQueue`)
//! - **observability**: derived stats for health checks
//! - **error**: the processor failure type
//!
//! # Example
//! ```ignore
//! let queue = EventQueue::builder()
//!     .config(QueueConfig::default())
//!     .processor(MyIndexer::new())
//!     .build();
//! queue.add(item).await;
//! queue.wait_for_processing().await;
//! ```

pub mod config;
pub mod error;
pub mod item;
pub mod observability;
pub mod queue;

pub use config::QueueConfig;
pub use error::ProcessError;
pub use item::{OpKind, Priority, QueueItem, TargetKey};
pub use observability::{KindCounts, PriorityCounts, QueueStats};
pub use queue::{EventQueue, EventQueueBuilder, ProcessedEvent, Processor, RetryPolicy};
