//! Delay strategy between failed attempts.
//!
//! The loop itself is fixed (bounded, sequential, identical instruction); only the pause
//! before the next attempt is pluggable.

use std::fmt;
use std::time::Duration;

use super::error::AttemptFailure;

pub trait RetryPolicy: Send + Sync + fmt::Debug {
    /// Pause before the attempt following failed attempt `attempt` (1-based).
    ///
    /// `Duration::ZERO` retries immediately without touching the timer.
    fn delay(&self, attempt: u32, failure: &AttemptFailure) -> Duration;
}

/// Retry straight away. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateRetry;

impl RetryPolicy for ImmediateRetry {
    fn delay(&self, _attempt: u32, _failure: &AttemptFailure) -> Duration {
        Duration::ZERO
    }
}

/// Exponential backoff: `min * 2^(attempt - 1)`, capped at `max`.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl ExponentialBackoff {
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay,
            max_delay: max_delay.max(min_delay),
        }
    }

    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn delay(&self, attempt: u32, _failure: &AttemptFailure) -> Duration {
        let base = self.min_delay.as_millis() as u64;
        let cap = self.max_delay.as_millis() as u64;
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        Duration::from_millis(base.saturating_mul(factor).min(cap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immediate_is_zero() {
        assert_eq!(
            ImmediateRetry.delay(1, &AttemptFailure::Extraction),
            Duration::ZERO
        );
    }

    #[test]
    fn test_exponential_doubles_and_caps() {
        let policy = ExponentialBackoff::from_millis(100, 350);
        let f = AttemptFailure::Extraction;
        assert_eq!(policy.delay(1, &f), Duration::from_millis(100));
        assert_eq!(policy.delay(2, &f), Duration::from_millis(200));
        assert_eq!(policy.delay(3, &f), Duration::from_millis(350));
        assert_eq!(policy.delay(80, &f), Duration::from_millis(350));
    }

    #[test]
    fn test_max_never_below_min() {
        let policy = ExponentialBackoff::from_millis(500, 10);
        assert_eq!(
            policy.delay(1, &AttemptFailure::Extraction),
            Duration::from_millis(500)
        );
    }
}
