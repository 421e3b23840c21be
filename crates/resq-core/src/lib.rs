pub mod config;
pub mod logging;

pub mod connect;
pub mod context;
pub mod executor;
pub mod retry;
pub mod rows;
pub mod statement;

pub use context::{ContextError, ExecutionContext, DEFAULT_QUERY_TIMEOUT};
pub use executor::{ExecResult, Executor};
pub use retry::{retry_operation, QueryError, RetryOutcome, RetryPolicy, Verdict};
pub use rows::Rows;
pub use statement::{PlaceholderFormat, Sql, Statement, StatementError, Value, ValueKind};
