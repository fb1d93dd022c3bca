//! Construction-time queue configuration.

use std::time::Duration;

/// Queue tuning knobs. All fields have defaults; override the ones you
/// care about with struct-update syntax:
///
/// ```ignore
/// let config = QueueConfig {
///     concurrency: 4,
///     ..QueueConfig::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum overlapping processor invocations.
    pub concurrency: usize,

    /// Debounce window: how long a notification waits for a newer one
    /// with the same target key before committing.
    pub debounce: Duration,

    /// Terminal retry count; reaching it removes the item and reports
    /// the failure once.
    pub max_retries: u32,

    /// Base delay for exponential backoff (first retry waits this long).
    pub retry_delay: Duration,

    /// Capacity bound: stored items plus armed debounce entries.
    pub max_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            debounce: Duration::from_secs(5),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            max_size: 1000,
        }
    }
}
