//! Classify driver errors into transient or permanent failures.

use super::error::QueryError;
use super::policy::Verdict;
use std::io;

/// SQLSTATE classes worth retrying: connection exception, operator
/// intervention, insufficient resources.
const TRANSIENT_SQLSTATE_CLASSES: [&str; 3] = ["08", "57", "53"];

/// Network failure phrases matched (case-insensitively) when nothing more
/// structured is available.
const TRANSIENT_PHRASES: [&str; 8] = [
    "connection reset by peer",
    "broken pipe",
    "connection refused",
    "no connection to the server",
    "unexpected eof",
    "unexpected end of stream",
    "unexpected end-of-stream",
    "connection timed out",
];

/// Errors that can be sorted into a [`Verdict`].
pub trait Classify {
    fn verdict(&self) -> Verdict;
}

impl Classify for QueryError {
    fn verdict(&self) -> Verdict {
        classify(self)
    }
}

impl Classify for sqlx::Error {
    fn verdict(&self) -> Verdict {
        classify_sqlx(self)
    }
}

/// Classify an executor error. Statement and context failures are never retried.
pub fn classify(e: &QueryError) -> Verdict {
    match e {
        QueryError::Build(_) | QueryError::Context(_) => Verdict::Permanent,
        QueryError::Database(db) => classify_sqlx(db),
    }
}

/// Classify a driver error: closed-connection sentinel, then structured
/// codes, then message text.
pub fn classify_sqlx(e: &sqlx::Error) -> Verdict {
    match e {
        // The connection's background worker is gone; a fresh one may work.
        sqlx::Error::WorkerCrashed => return Verdict::Transient,
        sqlx::Error::PoolTimedOut => return Verdict::Transient,
        sqlx::Error::PoolClosed => return Verdict::Permanent,
        sqlx::Error::Database(db) => {
            if let Some(code) = db.code() {
                return classify_sqlstate(&code);
            }
        }
        sqlx::Error::Io(io) => {
            if let Some(verdict) = classify_io_kind(io.kind()) {
                return verdict;
            }
        }
        _ => {}
    }
    classify_message(&e.to_string())
}

/// Classify a SQLSTATE by its two-character class.
pub fn classify_sqlstate(code: &str) -> Verdict {
    let class = code.get(..2).unwrap_or(code);
    if TRANSIENT_SQLSTATE_CLASSES.contains(&class) {
        Verdict::Transient
    } else {
        Verdict::Permanent
    }
}

/// Classify free-form error text by the network failure phrase set.
pub fn classify_message(message: &str) -> Verdict {
    let lower = message.to_ascii_lowercase();
    if TRANSIENT_PHRASES.iter().any(|p| lower.contains(p)) {
        Verdict::Transient
    } else {
        Verdict::Permanent
    }
}

fn classify_io_kind(kind: io::ErrorKind) -> Option<Verdict> {
    match kind {
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::NotConnected
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::TimedOut
        | io::ErrorKind::UnexpectedEof => Some(Verdict::Transient),
        _ => None,
    }
}
