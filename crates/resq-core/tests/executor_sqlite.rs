//! Integration test: executor modes against an in-memory SQLite database.
//!
//! Covers write, read-one-row and read-many-rows calls, statement build
//! failures and permanent driver errors.

mod common;

use resq_core::retry::{classify, Verdict};
use resq_core::{PlaceholderFormat, QueryError, Sql, StatementError, Value};
use sqlx::Row;
use std::time::{Duration, Instant};

#[tokio::test]
async fn exec_then_query_row_reads_back() {
    let executor = common::memory_executor().await;
    common::create_templates(&executor).await;

    let result = executor
        .exec(
            &Sql::new("INSERT INTO templates (name, body) VALUES (?, ?)")
                .bind("invoice")
                .bind("Dear {{name}}"),
        )
        .await
        .unwrap();
    assert_eq!(result.rows_affected, 1);
    let id = result.last_insert_id.expect("sqlite reports last insert id");

    let row = executor
        .query_row(&Sql::new("SELECT name, body FROM templates WHERE id = ?").bind(id))
        .await
        .unwrap();
    let name: String = row.try_get("name").unwrap();
    let body: String = row.try_get("body").unwrap();
    assert_eq!(name, "invoice");
    assert_eq!(body, "Dear {{name}}");
}

#[tokio::test]
async fn question_placeholders_and_null_values() {
    let executor = common::memory_executor()
        .await
        .with_placeholder(PlaceholderFormat::Question);
    common::create_templates(&executor).await;

    executor
        .exec(
            &Sql::new("INSERT INTO templates (name, body) VALUES (?, ?)")
                .bind("blank")
                .bind(Value::Null),
        )
        .await
        .unwrap();
    let row = executor
        .query_row(&Sql::new("SELECT body FROM templates WHERE name = ?").bind("blank"))
        .await
        .unwrap();
    let body: Option<String> = row.try_get("body").unwrap();
    assert!(body.is_none());
}

#[tokio::test]
async fn typed_nulls_bind_for_non_text_columns() {
    let executor = common::memory_executor().await;
    executor
        .exec(&Sql::new(
            "CREATE TABLE counters (id INTEGER PRIMARY KEY, hits INTEGER, ratio REAL, seen BOOLEAN)",
        ))
        .await
        .unwrap();
    executor
        .exec(
            &Sql::new("INSERT INTO counters (hits, ratio, seen) VALUES (?, ?, ?)")
                .bind(None::<i64>)
                .bind(None::<f64>)
                .bind(None::<bool>),
        )
        .await
        .unwrap();

    let row = executor
        .query_row(&Sql::new(
            "SELECT hits IS NULL AND ratio IS NULL AND seen IS NULL AS all_null FROM counters",
        ))
        .await
        .unwrap();
    assert_eq!(row.try_get::<i64, _>("all_null").unwrap(), 1);
}

#[tokio::test]
async fn query_streams_rows_in_order() {
    let executor = common::memory_executor().await;
    common::create_templates(&executor).await;
    for name in ["a", "b", "c", "d"] {
        executor
            .exec(&Sql::new("INSERT INTO templates (name) VALUES (?)").bind(name))
            .await
            .unwrap();
    }

    let mut rows = executor
        .query(&Sql::new("SELECT name FROM templates ORDER BY name"))
        .await
        .unwrap();
    let mut names = Vec::new();
    while let Some(row) = rows.next().await.unwrap() {
        names.push(row.try_get::<String, _>("name").unwrap());
    }
    assert_eq!(names, vec!["a", "b", "c", "d"]);
    // Exhausted cursors keep returning None.
    assert!(rows.next().await.unwrap().is_none());
}

#[tokio::test]
async fn partial_read_then_close_frees_the_connection() {
    let executor = common::memory_executor().await;
    common::create_templates(&executor).await;
    for name in ["x", "y", "z"] {
        executor
            .exec(&Sql::new("INSERT INTO templates (name) VALUES (?)").bind(name))
            .await
            .unwrap();
    }

    let mut rows = executor
        .query(&Sql::new("SELECT name FROM templates ORDER BY name"))
        .await
        .unwrap();
    let first = rows.next().await.unwrap().unwrap();
    assert_eq!(first.try_get::<String, _>("name").unwrap(), "x");
    let ctx = rows.context().clone();
    assert!(!ctx.is_cancelled());
    rows.close();
    // The default context belonged to the cursor.
    assert!(ctx.is_cancelled());

    // With a single-connection pool this only succeeds once the cursor let go.
    let row = executor
        .query_row(&Sql::new("SELECT COUNT(*) AS n FROM templates"))
        .await
        .unwrap();
    assert_eq!(row.try_get::<i64, _>("n").unwrap(), 3);
}

#[tokio::test]
async fn empty_result_set() {
    let executor = common::memory_executor().await;
    common::create_templates(&executor).await;
    let rows = executor
        .query(&Sql::new("SELECT name FROM templates"))
        .await
        .unwrap();
    assert!(rows.try_collect().await.unwrap().is_empty());
}

#[tokio::test]
async fn statement_errors_never_reach_the_database() {
    let executor = common::memory_executor().await;
    common::create_templates(&executor).await;

    let err = executor
        .exec(&Sql::new("INSERT INTO templates (name, body) VALUES (?, ?)").bind("only-one"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::Build(StatementError::ArgumentCount {
            placeholders: 2,
            arguments: 1
        })
    ));
    assert_eq!(classify(&err), Verdict::Permanent);

    let row = executor
        .query_row(&Sql::new("SELECT COUNT(*) AS n FROM templates"))
        .await
        .unwrap();
    assert_eq!(row.try_get::<i64, _>("n").unwrap(), 0);
}

#[tokio::test]
async fn permanent_driver_errors_return_without_backoff() {
    let executor = common::memory_executor()
        .await
        .with_policy(resq_core::RetryPolicy::default().with_max_attempts(5));
    common::create_templates(&executor).await;
    let insert = Sql::new("INSERT INTO templates (name) VALUES (?)").bind("dup");
    executor.exec(&insert).await.unwrap();

    let start = Instant::now();
    let err = executor.exec(&insert).await.unwrap_err();
    assert!(start.elapsed() < Duration::from_millis(100), "no backoff expected");
    assert!(matches!(err, QueryError::Database(sqlx::Error::Database(_))));
    assert_eq!(classify(&err), Verdict::Permanent);

    let err = executor
        .exec(&Sql::new("SELEC nonsense"))
        .await
        .unwrap_err();
    assert_eq!(classify(&err), Verdict::Permanent);
}

#[tokio::test]
async fn query_row_without_rows_is_permanent() {
    let executor = common::memory_executor().await;
    common::create_templates(&executor).await;
    let err = executor
        .query_row(&Sql::new("SELECT name FROM templates WHERE id = ?").bind(404i64))
        .await
        .err()
        .expect("no row should be an error");
    assert!(matches!(err, QueryError::Database(sqlx::Error::RowNotFound)));
    assert_eq!(classify(&err), Verdict::Permanent);
}

#[tokio::test]
async fn ping_through_executor() {
    let executor = common::memory_executor().await;
    executor.ping(None).await.unwrap();
}
