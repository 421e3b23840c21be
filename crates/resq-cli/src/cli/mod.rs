//! CLI for the resq resilient query executor.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use resq_core::config::{self, ResqConfig, RetryConfig};
use resq_core::connect::connect;

use commands::{run_exec, run_ping, run_query, run_query_row, run_wait};

/// Top-level CLI for resq.
#[derive(Debug, Parser)]
#[command(name = "resq")]
#[command(about = "resq: run SQL with deadlines and transient-error retry", long_about = None)]
pub struct Cli {
    /// Database URL (overrides the config file and DB_* variables).
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Deadline for each statement, in seconds.
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Maximum attempts per statement (including the first).
    #[arg(long, global = true, value_name = "N")]
    pub max_attempts: Option<u32>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Wait until the database accepts connections.
    Wait,

    /// Connect and ping the database once (with retries).
    Ping,

    /// Run a write statement and print the rows affected.
    Exec {
        /// Statement text with `?` placeholders.
        sql: String,
        /// Positional arguments: null, true/false, integers and floats are
        /// typed; anything else is text.
        args: Vec<String>,
    },

    /// Run a query and stream every row.
    Query {
        /// Statement text with `?` placeholders.
        sql: String,
        /// Positional arguments.
        args: Vec<String>,
        /// Print one JSON object per row instead of tab-separated values.
        #[arg(long)]
        json: bool,
    },

    /// Run a query that must return exactly one row.
    QueryRow {
        /// Statement text with `?` placeholders.
        sql: String,
        /// Positional arguments.
        args: Vec<String>,
        /// Print the row as a JSON object.
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Fold command-line overrides into the loaded configuration.
    pub fn apply_overrides(&self, cfg: &mut ResqConfig) {
        if let Some(url) = &self.url {
            cfg.database.url = Some(url.clone());
        }
        if let Some(secs) = self.timeout_secs {
            cfg.query_timeout_secs = secs;
        }
        if let Some(n) = self.max_attempts {
            cfg.retry.get_or_insert_with(RetryConfig::default).max_attempts = n;
        }
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        cli.apply_overrides(&mut cfg);
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Wait => run_wait(&cfg).await?,
            CliCommand::Ping => run_ping(&connect(&cfg).await?).await?,
            CliCommand::Exec { sql, args } => {
                run_exec(&connect(&cfg).await?, &sql, &args).await?;
            }
            CliCommand::Query { sql, args, json } => {
                run_query(&connect(&cfg).await?, &sql, &args, json).await?;
            }
            CliCommand::QueryRow { sql, args, json } => {
                run_query_row(&connect(&cfg).await?, &sql, &args, json).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
