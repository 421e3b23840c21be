//! Retry loop: run an operation until success, a permanent failure, or the
//! attempt ceiling.

use super::classify::Classify;
use super::policy::{millis, RetryDecision, RetryPolicy, Verdict};
use std::fmt::Display;
use std::future::Future;

/// Terminal state of a retry loop.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    Succeeded(T),
    /// The error was classified permanent; no further attempts were made.
    FailedPermanent(E),
    /// Every attempt failed transiently; carries the last error.
    FailedExhausted { attempts: u32, error: E },
}

impl<T, E> RetryOutcome<T, E> {
    /// Collapse into a `Result`, keeping only the last error.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryOutcome::Succeeded(v) => Ok(v),
            RetryOutcome::FailedPermanent(e) | RetryOutcome::FailedExhausted { error: e, .. } => {
                Err(e)
            }
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryOutcome::FailedExhausted { .. })
    }
}

/// Runs `op` under `policy`, classifying failures with `classify`.
/// On a transient failure, sleeps for the backoff duration then tries again.
pub async fn retry_outcome_by<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    classify: C,
    mut op: F,
) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> Verdict,
    E: Display,
{
    let max_attempts = policy.attempts();
    let mut attempt = 0u32;
    loop {
        let e = match op().await {
            Ok(v) => return RetryOutcome::Succeeded(v),
            Err(e) => e,
        };
        let verdict = classify(&e);
        match policy.decide(attempt, verdict) {
            RetryDecision::RetryAfter(delay) => {
                tracing::warn!(
                    attempt = attempt + 1,
                    max_attempts,
                    delay_ms = millis(delay),
                    error = %e,
                    "database operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            RetryDecision::NoRetry if verdict == Verdict::Permanent => {
                tracing::debug!(attempt = attempt + 1, error = %e, "permanent failure, not retrying");
                return RetryOutcome::FailedPermanent(e);
            }
            RetryDecision::NoRetry => {
                tracing::debug!(attempts = attempt + 1, error = %e, "retry attempts exhausted");
                return RetryOutcome::FailedExhausted {
                    attempts: attempt + 1,
                    error: e,
                };
            }
        }
    }
}

/// [`retry_outcome_by`] using the error's own classification.
pub async fn retry_outcome<T, E, F, Fut>(policy: &RetryPolicy, op: F) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + Display,
{
    retry_outcome_by(policy, E::verdict, op).await
}

/// Run `op` with the default backoff and up to `max_attempts` attempts,
/// returning the value or the last error.
pub async fn retry_operation<T, E, F, Fut>(op: F, max_attempts: u32) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + Display,
{
    let policy = RetryPolicy::default().with_max_attempts(max_attempts);
    retry_outcome(&policy, op).await.into_result()
}
