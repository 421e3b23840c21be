//! `resq wait` – block until the database accepts connections.

use anyhow::Result;
use resq_core::config::ResqConfig;
use resq_core::connect::wait_for_database;

pub async fn run_wait(cfg: &ResqConfig) -> Result<()> {
    wait_for_database(&cfg.database, &cfg.wait_config()).await?;
    println!("Database is ready.");
    Ok(())
}
