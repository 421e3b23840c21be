use std::time::Duration;

/// Binary classification of a failure for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Expected to resolve on its own (connection hiccup, server restarting).
    Transient,
    /// Retrying will not help (bad statement, constraint violation, deadline).
    Permanent,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff policy with an attempt ceiling.
///
/// `delay(attempt) = base_delay * multiplier^attempt`, attempts counted from 0.
/// Growth is unbounded unless `max_delay` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first). Zero behaves like one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Growth factor applied per attempt.
    pub multiplier: u32,
    /// Optional upper bound on a single delay.
    pub max_delay: Option<Duration>,
}

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_MULTIPLIER: u32 = 2;

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
            max_delay: None,
        }
    }
}

impl RetryPolicy {
    /// Fixed-interval policy (multiplier 1), used for connection polling.
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: interval,
            multiplier: 1,
            max_delay: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Backoff before the attempt following `attempt` (0-based). Saturates
    /// instead of overflowing.
    pub fn delay(&self, attempt: u32) -> Duration {
        let raw = self
            .multiplier
            .checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX);
        match self.max_delay {
            Some(cap) => raw.min(cap),
            None => raw,
        }
    }

    /// Effective attempt ceiling; the operation always runs at least once.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Decide what to do after `attempt` (0-based) failed with `verdict`.
    pub fn decide(&self, attempt: u32, verdict: Verdict) -> RetryDecision {
        match verdict {
            Verdict::Permanent => RetryDecision::NoRetry,
            Verdict::Transient if attempt + 1 >= self.attempts() => RetryDecision::NoRetry,
            Verdict::Transient => RetryDecision::RetryAfter(self.delay(attempt)),
        }
    }
}

/// Whole milliseconds for log fields, pinned at `u64::MAX`.
pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
