//! Error returned by every executor call.

use crate::context::ContextError;
use crate::statement::StatementError;

/// Failure of a scoped database call.
///
/// Retry exhaustion is not a separate variant: the last underlying error is
/// returned as-is. Use [`RetryOutcome`](super::RetryOutcome) when the terminal
/// state matters.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The statement could not be translated into query text; nothing was sent.
    #[error("building statement: {0}")]
    Build(#[from] StatementError),
    /// The execution context expired or was cancelled.
    #[error(transparent)]
    Context(#[from] ContextError),
    /// The driver reported an error.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl QueryError {
    /// Underlying driver error, if any.
    pub fn as_database(&self) -> Option<&sqlx::Error> {
        match self {
            QueryError::Database(e) => Some(e),
            QueryError::Build(_) | QueryError::Context(_) => None,
        }
    }

    pub fn is_context(&self) -> bool {
        matches!(self, QueryError::Context(_))
    }
}
