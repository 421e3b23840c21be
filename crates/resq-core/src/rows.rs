//! Row cursor returned by read-many-rows calls.

use crate::context::{ContextScope, ExecutionContext};
use crate::executor::bind_values;
use crate::retry::QueryError;
use crate::statement::Value;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use sqlx::any::AnyRow;
use sqlx::AnyPool;

/// Streams rows for `sql`; owns everything it borrows from.
pub(crate) fn row_stream(
    pool: AnyPool,
    sql: String,
    args: Vec<Value>,
) -> BoxStream<'static, Result<AnyRow, sqlx::Error>> {
    fn owned(
        pool: AnyPool,
        sql: String,
        args: Vec<Value>,
    ) -> impl Stream<Item = Result<AnyRow, sqlx::Error>> + Send + 'static {
        async_stream::stream! {
            let mut rows = bind_values(sqlx::query(&sql), &args).fetch(&pool);
            while let Some(row) = rows.next().await {
                yield row;
            }
        }
    }
    owned(pool, sql, args).boxed()
}

/// Open result cursor. The caller owns it; dropping or [`Rows::close`]
/// releases the underlying connection and any context created for the query.
///
/// Every fetch is bounded by the query's execution context.
pub struct Rows {
    first: Option<AnyRow>,
    stream: BoxStream<'static, Result<AnyRow, sqlx::Error>>,
    scope: ContextScope,
    done: bool,
}

impl Rows {
    pub(crate) fn new(
        first: Option<AnyRow>,
        stream: BoxStream<'static, Result<AnyRow, sqlx::Error>>,
        scope: ContextScope,
    ) -> Self {
        let done = first.is_none();
        Self {
            first,
            stream,
            scope,
            done,
        }
    }

    /// Next row, or `None` once the result set is exhausted.
    pub async fn next(&mut self) -> Result<Option<AnyRow>, QueryError> {
        if let Some(row) = self.first.take() {
            return Ok(Some(row));
        }
        if self.done {
            return Ok(None);
        }
        let next = self.scope.context().run(self.stream.next()).await?;
        match next {
            Some(row) => Ok(Some(row?)),
            None => {
                self.done = true;
                Ok(None)
            }
        }
    }

    /// Drain the remaining rows.
    pub async fn try_collect(mut self) -> Result<Vec<AnyRow>, QueryError> {
        let mut out = Vec::new();
        while let Some(row) = self.next().await? {
            out.push(row);
        }
        Ok(out)
    }

    pub fn context(&self) -> &ExecutionContext {
        self.scope.context()
    }

    /// Release the cursor before the result set is exhausted.
    pub fn close(self) {}
}

impl std::fmt::Debug for Rows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rows")
            .field("buffered", &self.first.is_some())
            .field("done", &self.done)
            .field("scope", &self.scope)
            .finish()
    }
}
