//! Retry and backoff policy.
//!
//! This module encapsulates error classification (connection failures,
//! SQLSTATE classes, network phrases) and exponential backoff decisions so
//! that the executor and any other subsystem share one resilience contract.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_message, classify_sqlstate, classify_sqlx, Classify};
pub use error::QueryError;
pub(crate) use policy::millis;
pub use policy::{
    RetryDecision, RetryPolicy, Verdict, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MULTIPLIER,
};
pub use run::{retry_operation, retry_outcome, retry_outcome_by, RetryOutcome};
