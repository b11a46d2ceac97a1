//! Per-key exponential retry backoff for transient reconcile failures.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

/// Tracks consecutive failures per policy key.
///
/// The n-th consecutive failure (0-based) waits `base * 2^n`, capped at `max`.
/// A successful pass resets the key.
#[derive(Debug)]
pub struct RetryBackoff {
    base: Duration,
    max: Duration,
    failures: HashMap<String, u32>,
}

impl RetryBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: HashMap::new(),
        }
    }

    /// Record a failure for `key` and return how long to wait before retrying.
    pub fn next_delay(&mut self, key: &str) -> Duration {
        let failures = self.failures.entry(key.to_string()).or_insert(0);
        let delay = self
            .base
            .saturating_mul(2u32.saturating_pow(*failures))
            .min(self.max);
        *failures = failures.saturating_add(1);
        debug!(%key, failures = *failures, delay_ms = delay.as_millis() as u64, "retry backoff");
        delay
    }

    /// Forget the failure history of `key`.
    pub fn reset(&mut self, key: &str) {
        self.failures.remove(key);
    }

    /// Consecutive failures recorded for `key`.
    pub fn failures(&self, key: &str) -> u32 {
        self.failures.get(key).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_per_failure() {
        let mut backoff = RetryBackoff::new(Duration::from_secs(1), Duration::from_secs(60));

        assert_eq!(backoff.next_delay("default/web"), Duration::from_secs(1));
        assert_eq!(backoff.next_delay("default/web"), Duration::from_secs(2));
        assert_eq!(backoff.next_delay("default/web"), Duration::from_secs(4));
        assert_eq!(backoff.failures("default/web"), 3);
    }

    #[test]
    fn delay_caps_at_max() {
        let mut backoff = RetryBackoff::new(Duration::from_secs(1), Duration::from_secs(60));
        for _ in 0..40 {
            backoff.next_delay("default/web");
        }
        // 1 → 2 → 4 → … → 60 → 60
        assert_eq!(backoff.next_delay("default/web"), Duration::from_secs(60));
    }

    #[test]
    fn keys_are_independent_and_reset() {
        let mut backoff = RetryBackoff::new(Duration::from_millis(500), Duration::from_secs(60));
        backoff.next_delay("a/x");
        backoff.next_delay("a/x");
        assert_eq!(backoff.next_delay("b/y"), Duration::from_millis(500));

        backoff.reset("a/x");
        assert_eq!(backoff.failures("a/x"), 0);
        assert_eq!(backoff.next_delay("a/x"), Duration::from_millis(500));
    }
}
