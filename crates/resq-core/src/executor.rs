//! Scoped operation runner: statement translation, execution context and
//! retry around every database round trip.

use crate::config::ResqConfig;
use crate::context::{ContextScope, ExecutionContext, DEFAULT_QUERY_TIMEOUT};
use crate::retry::{retry_outcome, QueryError, RetryPolicy};
use crate::rows::{row_stream, Rows};
use crate::statement::{PlaceholderFormat, Statement, Value, ValueKind};
use futures::StreamExt;
use sqlx::any::{AnyArguments, AnyQueryResult, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Connection};
use std::future::Future;
use std::time::Duration;

/// Result of a write statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

impl From<AnyQueryResult> for ExecResult {
    fn from(r: AnyQueryResult) -> Self {
        Self {
            rows_affected: r.rows_affected(),
            last_insert_id: r.last_insert_id(),
        }
    }
}

/// Handle owning the pool and the resilience settings applied to each call.
///
/// Cheap to clone; `with_*` builders return per-call overrides without
/// touching the original.
#[derive(Debug, Clone)]
pub struct Executor {
    pool: AnyPool,
    policy: RetryPolicy,
    default_timeout: Duration,
    placeholder: PlaceholderFormat,
}

impl Executor {
    pub fn new(pool: AnyPool) -> Self {
        Self {
            pool,
            policy: RetryPolicy::default(),
            default_timeout: DEFAULT_QUERY_TIMEOUT,
            placeholder: PlaceholderFormat::default(),
        }
    }

    pub fn from_config(pool: AnyPool, cfg: &ResqConfig) -> Self {
        Self {
            pool,
            policy: cfg.retry_policy(),
            default_timeout: cfg.query_timeout(),
            placeholder: cfg.placeholder.unwrap_or_default(),
        }
    }

    pub fn with_policy(&self, policy: RetryPolicy) -> Self {
        Self {
            policy,
            ..self.clone()
        }
    }

    pub fn with_default_timeout(&self, timeout: Duration) -> Self {
        Self {
            default_timeout: timeout,
            ..self.clone()
        }
    }

    pub fn with_placeholder(&self, placeholder: PlaceholderFormat) -> Self {
        Self {
            placeholder,
            ..self.clone()
        }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Run `op` under `ctx` (or a fresh context with the default timeout,
    /// released before returning) and retry it per the policy.
    ///
    /// `op` may run several times and must be safe to repeat.
    pub async fn run_scoped<T, F, Fut>(
        &self,
        ctx: Option<&ExecutionContext>,
        op: F,
    ) -> Result<T, QueryError>
    where
        F: FnMut(ExecutionContext) -> Fut,
        Fut: Future<Output = Result<T, QueryError>>,
    {
        let scope = ContextScope::enter(ctx, self.default_timeout);
        self.retry_in(scope.context(), op).await
    }

    async fn retry_in<T, F, Fut>(&self, ctx: &ExecutionContext, mut op: F) -> Result<T, QueryError>
    where
        F: FnMut(ExecutionContext) -> Fut,
        Fut: Future<Output = Result<T, QueryError>>,
    {
        let attempts = retry_outcome(&self.policy, || op(ctx.clone()));
        ctx.run(attempts).await?.into_result()
    }

    fn translate<S>(&self, stmt: &S) -> Result<(String, Vec<Value>), QueryError>
    where
        S: Statement + ?Sized,
    {
        stmt.to_sql(self.placeholder).map_err(|e| {
            tracing::debug!("error building statement: {}", e);
            QueryError::Build(e)
        })
    }

    /// Write mode with a default context.
    pub async fn exec<S>(&self, stmt: &S) -> Result<ExecResult, QueryError>
    where
        S: Statement + ?Sized,
    {
        self.exec_with(stmt, None).await
    }

    pub async fn exec_with<S>(
        &self,
        stmt: &S,
        ctx: Option<&ExecutionContext>,
    ) -> Result<ExecResult, QueryError>
    where
        S: Statement + ?Sized,
    {
        let (sql, args) = self.translate(stmt)?;
        let (pool, sql, args) = (&self.pool, sql.as_str(), args.as_slice());
        self.run_scoped(ctx, move |_| {
            let query = bind_values(sqlx::query(sql), args);
            async move { Ok::<_, QueryError>(query.execute(pool).await?.into()) }
        })
        .await
    }

    /// Read-one-row mode with a default context. No row is an error.
    pub async fn query_row<S>(&self, stmt: &S) -> Result<AnyRow, QueryError>
    where
        S: Statement + ?Sized,
    {
        self.query_row_with(stmt, None).await
    }

    pub async fn query_row_with<S>(
        &self,
        stmt: &S,
        ctx: Option<&ExecutionContext>,
    ) -> Result<AnyRow, QueryError>
    where
        S: Statement + ?Sized,
    {
        let (sql, args) = self.translate(stmt)?;
        let (pool, sql, args) = (&self.pool, sql.as_str(), args.as_slice());
        self.run_scoped(ctx, move |_| {
            let query = bind_values(sqlx::query(sql), args);
            async move { Ok::<_, QueryError>(query.fetch_one(pool).await?) }
        })
        .await
    }

    /// Read-many-rows mode with a default context. See [`Executor::query_with`].
    pub async fn query<S>(&self, stmt: &S) -> Result<Rows, QueryError>
    where
        S: Statement + ?Sized,
    {
        self.query_with(stmt, None).await
    }

    /// Open a cursor. The first row is fetched inside the retry loop; later
    /// rows stream through [`Rows::next`] and are not retried. A default
    /// context created here belongs to the cursor and is released with it.
    pub async fn query_with<S>(
        &self,
        stmt: &S,
        ctx: Option<&ExecutionContext>,
    ) -> Result<Rows, QueryError>
    where
        S: Statement + ?Sized,
    {
        let (sql, args) = self.translate(stmt)?;
        let scope = ContextScope::enter(ctx, self.default_timeout);
        let (pool, sql, args) = (&self.pool, &sql, &args);
        let (first, stream) = self
            .retry_in(scope.context(), move |_| {
                let mut stream = row_stream(pool.clone(), sql.clone(), args.clone());
                async move {
                    let first = stream.next().await.transpose()?;
                    Ok::<_, QueryError>((first, stream))
                }
            })
            .await?;
        Ok(Rows::new(first, stream, scope))
    }

    /// Check connectivity through the same scoped, retried path.
    pub async fn ping(&self, ctx: Option<&ExecutionContext>) -> Result<(), QueryError> {
        let pool = &self.pool;
        self.run_scoped(ctx, move |_| async move {
            let mut conn = pool.acquire().await?;
            conn.ping().await?;
            Ok::<_, QueryError>(())
        })
        .await
    }
}

/// Bind positional arguments in order.
pub(crate) fn bind_values<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    args: &[Value],
) -> Query<'q, Any, AnyArguments<'q>> {
    for value in args {
        query = match value {
            Value::Null | Value::NullOf(ValueKind::Text) => query.bind(None::<String>),
            Value::NullOf(ValueKind::Bool) => query.bind(None::<bool>),
            Value::NullOf(ValueKind::Int) => query.bind(None::<i64>),
            Value::NullOf(ValueKind::Float) => query.bind(None::<f64>),
            Value::NullOf(ValueKind::Bytes) => query.bind(None::<Vec<u8>>),
            Value::Bool(v) => query.bind(*v),
            Value::Int(v) => query.bind(*v),
            Value::Float(v) => query.bind(*v),
            Value::Text(v) => query.bind(v.clone()),
            Value::Bytes(v) => query.bind(v.clone()),
        };
    }
    query
}
