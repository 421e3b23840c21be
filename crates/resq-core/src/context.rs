//! Execution contexts: a deadline plus a cancellation signal around one
//! logical database call, however many attempts it takes.

use crate::retry::millis;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Timeout applied when the caller does not supply a context.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Stand-in deadline for timeouts too large to represent, roughly 30 years out.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or(now + FAR_FUTURE)
}

/// Why a context stopped admitting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("context deadline exceeded")]
    DeadlineExceeded,
    #[error("context cancelled")]
    Cancelled,
}

/// Deadline and cancellation envelope. Clones share the same signal.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    deadline: Instant,
    token: CancellationToken,
}

impl ExecutionContext {
    /// Context expiring `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(deadline_after(timeout))
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline,
            token: CancellationToken::new(),
        }
    }

    /// Nested context: expires no later than `self` and is cancelled with it.
    pub fn child(&self, timeout: Duration) -> Self {
        Self {
            deadline: self.deadline.min(deadline_after(timeout)),
            token: self.token.child_token(),
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Why the context no longer admits work, or `None` while it is live.
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            Some(ContextError::Cancelled)
        } else if Instant::now() >= self.deadline {
            Some(ContextError::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Run `fut` until it completes, the deadline passes, or the context is
    /// cancelled, whichever comes first. An already-dead context never polls `fut`.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, ContextError> {
        if let Some(e) = self.err() {
            return Err(e);
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ContextError::Cancelled),
            _ = tokio::time::sleep_until(self.deadline) => Err(ContextError::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}

/// The context active for one executor call.
///
/// Wraps either a caller-supplied context (left untouched) or a fresh one
/// created with the default timeout, which is cancelled when the scope drops.
#[derive(Debug)]
pub struct ContextScope {
    context: ExecutionContext,
    release: Option<DropGuard>,
}

impl ContextScope {
    pub fn enter(supplied: Option<&ExecutionContext>, default_timeout: Duration) -> Self {
        match supplied {
            Some(ctx) => Self {
                context: ctx.clone(),
                release: None,
            },
            None => {
                let context = ExecutionContext::with_timeout(default_timeout);
                tracing::debug!(
                    timeout_ms = millis(default_timeout),
                    "created default execution context"
                );
                let release = context.token.clone().drop_guard();
                Self {
                    context,
                    release: Some(release),
                }
            }
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// True when the scope created (and will release) its context.
    pub fn owns_context(&self) -> bool {
        self.release.is_some()
    }
}
