//! Shared helpers: an executor over a private in-memory SQLite database.

#![allow(dead_code)]

use resq_core::retry::RetryPolicy;
use resq_core::Executor;
use sqlx::any::AnyPoolOptions;
use std::time::Duration;

/// Single-connection pool so every call sees the same in-memory database.
pub async fn memory_executor() -> Executor {
    sqlx::any::install_default_drivers();
    let pool = AnyPoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite");
    Executor::new(pool)
}

/// Policy with millisecond backoff so retry tests stay fast.
pub fn quick_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(1),
        ..RetryPolicy::default()
    }
}

pub async fn create_templates(executor: &Executor) {
    executor
        .exec(&resq_core::Sql::new(
            "CREATE TABLE templates (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL UNIQUE, body TEXT)",
        ))
        .await
        .expect("create table");
}
