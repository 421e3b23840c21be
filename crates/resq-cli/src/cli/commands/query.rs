//! `resq query` and `resq query-row` – print result rows.

use anyhow::Result;
use resq_core::Executor;

use super::statement;
use crate::cli::output::{header, row_to_json, row_to_tsv};

/// Streams rows as they arrive; the header comes from the first row.
pub async fn run_query(executor: &Executor, sql: &str, args: &[String], json: bool) -> Result<()> {
    let mut rows = executor.query(&statement(sql, args)).await?;
    let mut count = 0usize;
    while let Some(row) = rows.next().await? {
        if json {
            println!("{}", serde_json::Value::Object(row_to_json(&row)));
        } else {
            if count == 0 {
                println!("{}", header(&row));
            }
            println!("{}", row_to_tsv(&row));
        }
        count += 1;
    }
    rows.close();
    tracing::debug!(rows = count, "query finished");
    if count == 0 && !json {
        println!("(no rows)");
    }
    Ok(())
}

pub async fn run_query_row(
    executor: &Executor,
    sql: &str,
    args: &[String],
    json: bool,
) -> Result<()> {
    let row = executor.query_row(&statement(sql, args)).await?;
    if json {
        println!("{}", serde_json::Value::Object(row_to_json(&row)));
    } else {
        println!("{}", header(&row));
        println!("{}", row_to_tsv(&row));
    }
    Ok(())
}
