//! `resq exec <sql> [args...]` – run a write statement.

use anyhow::Result;
use resq_core::Executor;

use super::statement;

pub async fn run_exec(executor: &Executor, sql: &str, args: &[String]) -> Result<()> {
    let result = executor.exec(&statement(sql, args)).await?;
    println!("rows affected: {}", result.rows_affected);
    if let Some(id) = result.last_insert_id {
        println!("last insert id: {id}");
    }
    Ok(())
}
