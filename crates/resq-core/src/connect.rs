//! Opening the pool and waiting for the database to come up.

use crate::config::{DatabaseConfig, ResqConfig, WaitConfig};
use crate::executor::Executor;
use crate::retry::{retry_outcome_by, RetryOutcome, Verdict};
use anyhow::{Context, Result};
use sqlx::any::AnyPoolOptions;
use sqlx::{AnyConnection, Connection};

/// Open a pool for `cfg`, ping it, and wrap it in an [`Executor`].
pub async fn connect(cfg: &ResqConfig) -> Result<Executor> {
    sqlx::any::install_default_drivers();
    let url = cfg.database.connect_url()?;
    let pool = AnyPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .acquire_timeout(cfg.query_timeout())
        .connect_lazy(&url)
        .context("error connecting to database")?;

    let executor = Executor::from_config(pool, cfg);
    executor
        .ping(None)
        .await
        .context("error connecting to database")?;
    tracing::info!(host = %cfg.database.host, dbname = %cfg.database.dbname, "connected to database");
    Ok(executor)
}

/// Poll until the database accepts a connection and answers a ping.
///
/// Every failure counts as "not ready yet"; the last error is returned once
/// `wait.max_attempts` attempts have failed.
pub async fn wait_for_database(db: &DatabaseConfig, wait: &WaitConfig) -> Result<()> {
    sqlx::any::install_default_drivers();
    let url = db.connect_url()?;
    let policy = wait.policy();

    tracing::info!("waiting for database to be ready...");
    let outcome = retry_outcome_by(
        &policy,
        |_: &sqlx::Error| Verdict::Transient,
        || {
            let url = url.clone();
            async move {
                let mut conn = AnyConnection::connect(&url).await?;
                conn.ping().await?;
                conn.close().await
            }
        },
    )
    .await;

    match outcome {
        RetryOutcome::Succeeded(()) => {
            tracing::info!("database is ready");
            Ok(())
        }
        RetryOutcome::FailedExhausted { attempts, error } => Err(anyhow::Error::new(error)
            .context(format!("database not available after {attempts} attempts"))),
        RetryOutcome::FailedPermanent(error) => Err(error.into()),
    }
}
