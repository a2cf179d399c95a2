use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::Error;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    #[must_use]
    pub const fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.save_max_retries, config.save_retry_delay())
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether `error`, raised by attempt number `attempt` (1-based), earns
    /// another attempt.
    #[must_use]
    pub const fn should_retry(&self, attempt: u32, error: &Error) -> bool {
        error.is_transient() && attempt <= self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_retry_until_bound() {
        let policy = RetryPolicy::default();
        let error = Error::Transient("503".to_string());
        assert!(policy.should_retry(1, &error));
        assert!(policy.should_retry(3, &error));
        assert!(!policy.should_retry(4, &error));
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn other_errors_never_retry() {
        let policy = RetryPolicy::default();
        assert!(!policy.should_retry(1, &Error::Conflict));
        assert!(!policy.should_retry(1, &Error::Auth("expired".to_string())));
        assert!(!policy.should_retry(1, &Error::MalformedResponse("{}".to_string())));
    }

    #[test]
    fn zero_retries_means_single_attempt() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert!(!policy.should_retry(1, &Error::Transient("timeout".to_string())));
        assert_eq!(policy.max_attempts(), 1);
    }
}
