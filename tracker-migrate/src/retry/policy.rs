//! Retry policy.

use serde::Deserialize;
use std::time::Duration;

/// Maximum time to honour a single `Retry-After` hint (5 minutes).
pub(crate) const MAX_RETRY_AFTER_SECS: u64 = 300;

/// Bounded exponential backoff settings for remote calls.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,

    /// Delay before the second attempt, in milliseconds. Doubles each retry.
    pub base_delay_ms: u64,

    /// Upper bound for a single backoff delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries without sleeping between attempts.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Returns the backoff delay to wait after the given failed attempt (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}
