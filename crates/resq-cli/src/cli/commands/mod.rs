//! CLI command handlers. Each command is in its own file.

mod exec;
mod ping;
mod query;
mod wait;

pub use exec::run_exec;
pub use ping::run_ping;
pub use query::{run_query, run_query_row};
pub use wait::run_wait;

use resq_core::{Sql, Value};

/// Type a command-line argument literal.
pub(crate) fn parse_arg(raw: &str) -> Value {
    match raw {
        "null" | "NULL" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if let Ok(v) = raw.parse::<i64>() {
                Value::Int(v)
            } else if let Ok(v) = raw.parse::<f64>() {
                Value::Float(v)
            } else {
                Value::Text(raw.to_string())
            }
        }
    }
}

pub(crate) fn statement(sql: &str, args: &[String]) -> Sql {
    Sql::new(sql).with_args(args.iter().map(|a| parse_arg(a)))
}
