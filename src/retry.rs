use std::time::Duration;

use crate::options::RetryPolicy;

/// Per-call retry bookkeeping derived from an immutable [`RetryPolicy`].
#[derive(Debug)]
pub(crate) struct RetryState<'a> {
    policy: &'a RetryPolicy,
    attempt: u32,
}

impl<'a> RetryState<'a> {
    pub(crate) fn new(policy: &'a RetryPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Starts the next attempt and returns its 1-based number.
    pub(crate) fn begin_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Delay to wait before another attempt, or `None` once the budget is spent.
    pub(crate) fn next_backoff(&self) -> Option<Duration> {
        let budget = self.policy.max_attempts.max(1);
        if self.attempt >= budget {
            return None;
        }
        Some(backoff_delay(self.policy, self.attempt))
    }
}

/// `min(min_timeout * factor^(attempt - 1), max_timeout)`.
pub(crate) fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(32);
    let multiplier = u64::from(policy.factor.max(1)).saturating_pow(exp);
    let delay_ms = policy
        .min_timeout_ms
        .saturating_mul(multiplier)
        .min(policy.max_timeout_ms.max(policy.min_timeout_ms));
    Duration::from_millis(delay_ms)
}
