//! `resq ping` – one ping through the retrying executor.

use anyhow::Result;
use resq_core::Executor;

pub async fn run_ping(executor: &Executor) -> Result<()> {
    executor.ping(None).await?;
    println!("OK");
    Ok(())
}
