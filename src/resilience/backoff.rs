//! Delay between attempts.

use std::time::Duration;

use rand::Rng;

use crate::config::{BackoffKind, ExecutorConfig};

/// How long to wait before a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// The same delay before every retry.
    Fixed(Duration),
    /// Doubling delay with up to 10% jitter, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl BackoffStrategy {
    pub fn from_config(config: &ExecutorConfig) -> Self {
        match config.backoff {
            BackoffKind::Fixed => BackoffStrategy::Fixed(config.retry_delay()),
            BackoffKind::Exponential => BackoffStrategy::Exponential {
                base: config.retry_delay(),
                max: config.max_delay(),
            },
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        match *self {
            BackoffStrategy::Fixed(delay) => delay,
            BackoffStrategy::Exponential { base, max } => calculate_backoff(retry, base, max),
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        BackoffStrategy::Fixed(Duration::from_secs(5))
    }
}

/// Exponential backoff with jitter.
pub fn calculate_backoff(retry: u32, base: Duration, max: Duration) -> Duration {
    if retry == 0 {
        return Duration::ZERO;
    }

    let base_ms = base.as_millis() as u64;
    let max_ms = max.as_millis() as u64;
    let exponential_base = 2u64.saturating_pow(retry - 1);
    let capped_delay = base_ms.saturating_mul(exponential_base).min(max_ms);

    // Jitter: 0 to 10% of the delay
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
