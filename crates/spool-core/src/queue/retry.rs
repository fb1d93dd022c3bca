//! Retry policy: decides backoff delays.

use std::time::Duration;

/// Deterministic exponential backoff.
///
/// delay = base_delay * 2^(retries - 1), so the first retry waits the
/// base delay. No jitter is applied: the formula is part of the
/// observable contract and tests rely on it.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Terminal attempt count.
    pub max_retries: u32,
}

impl RetryPolicy {
    pub fn new(base_delay: Duration, max_retries: u32) -> Self {
        Self {
            base_delay,
            max_retries,
        }
    }

    /// Delay before the next attempt, given the number of failures so
    /// far (1-indexed). Saturates instead of overflowing for absurd
    /// retry counts.
    pub fn next_delay(&self, retries: u32) -> Duration {
        let exponent = retries.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Has this item burned through its attempt budget?
    pub fn is_exhausted(&self, retries: u32) -> bool {
        retries >= self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 100)]
    #[case(2, 200)]
    #[case(3, 400)]
    #[case(4, 800)]
    fn backoff_doubles_per_failure(#[case] retries: u32, #[case] expected_ms: u64) {
        let policy = RetryPolicy::new(Duration::from_millis(100), 5);
        assert_eq!(policy.next_delay(retries), Duration::from_millis(expected_ms));
    }

    #[test]
    fn zero_retries_uses_base_delay() {
        let policy = RetryPolicy::new(Duration::from_millis(100), 3);
        assert_eq!(policy.next_delay(0), Duration::from_millis(100));
    }

    #[test]
    fn exhaustion_is_inclusive() {
        let policy = RetryPolicy::new(Duration::from_millis(100), 3);
        assert!(!policy.is_exhausted(2));
        assert!(policy.is_exhausted(3));
        assert!(policy.is_exhausted(4));
    }

    #[test]
    fn huge_retry_counts_saturate() {
        let policy = RetryPolicy::new(Duration::from_secs(1), u32::MAX);
        // Must not panic; exact value is irrelevant at this magnitude.
        let _ = policy.next_delay(u32::MAX);
    }
}
