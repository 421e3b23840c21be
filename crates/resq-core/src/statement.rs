//! Statement descriptions and their translation into query text plus
//! positional arguments.

use serde::{Deserialize, Serialize};

/// Placeholder style emitted by [`Statement::to_sql`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderFormat {
    /// `$1, $2, ...` (Postgres).
    #[default]
    Dollar,
    /// `?` left as written.
    Question,
}

/// Declared type of a null argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
    Bytes,
}

/// A positional argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Untyped null; bound as a text null. Prefer [`Value::NullOf`] for
    /// non-text columns on servers that type-check parameters.
    Null,
    NullOf(ValueKind),
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

/// Rust types whose `None` becomes a typed null.
pub trait Kinded: Into<Value> {
    const KIND: ValueKind;
}

macro_rules! kinded {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(impl Kinded for $ty {
            const KIND: ValueKind = ValueKind::$kind;
        })*
    };
}

kinded! {
    bool => Bool,
    i32 => Int,
    i64 => Int,
    f64 => Float,
    &str => Text,
    String => Text,
    Vec<u8> => Bytes,
}

impl<T: Kinded> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::NullOf(T::KIND), Into::into)
    }
}

/// Why a statement could not be translated. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatementError {
    #[error("statement text is empty")]
    Empty,
    #[error("statement has {placeholders} placeholder(s) but {arguments} argument(s)")]
    ArgumentCount { placeholders: usize, arguments: usize },
    #[error("unterminated {0} in statement text")]
    UnterminatedQuote(char),
}

/// Something that can be turned into query text and arguments.
pub trait Statement {
    fn to_sql(&self, format: PlaceholderFormat) -> Result<(String, Vec<Value>), StatementError>;
}

/// Statement written with `?` placeholders. `??` is a literal `?` in
/// `Dollar` output; `Question` output keeps `??` as written, since there
/// every bare `?` is a parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Sql {
    text: String,
    args: Vec<Value>,
}

impl Sql {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            args: Vec::new(),
        }
    }

    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = Value>) -> Self {
        self.args.extend(args);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

impl Statement for Sql {
    fn to_sql(&self, format: PlaceholderFormat) -> Result<(String, Vec<Value>), StatementError> {
        let (text, placeholders) = rewrite_placeholders(&self.text, format)?;
        if placeholders != self.args.len() {
            return Err(StatementError::ArgumentCount {
                placeholders,
                arguments: self.args.len(),
            });
        }
        Ok((text, self.args.clone()))
    }
}

/// Rewrite `?` placeholders outside quotes and line comments, returning the
/// new text and the number of placeholders seen.
fn rewrite_placeholders(
    text: &str,
    format: PlaceholderFormat,
) -> Result<(String, usize), StatementError> {
    if text.trim().is_empty() {
        return Err(StatementError::Empty);
    }

    let mut out = String::with_capacity(text.len() + 8);
    let mut count = 0usize;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                out.push(c);
                let mut closed = false;
                while let Some(q) = chars.next() {
                    out.push(q);
                    if q == c {
                        // Doubled quote is an escaped quote, not the end.
                        if chars.peek() == Some(&c) {
                            out.push(c);
                            chars.next();
                            continue;
                        }
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(StatementError::UnterminatedQuote(c));
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                out.push(c);
                for l in chars.by_ref() {
                    out.push(l);
                    if l == '\n' {
                        break;
                    }
                }
            }
            '?' if chars.peek() == Some(&'?') => {
                chars.next();
                match format {
                    PlaceholderFormat::Dollar => out.push('?'),
                    // A lone `?` would read as a parameter in this format.
                    PlaceholderFormat::Question => out.push_str("??"),
                }
            }
            '?' => {
                count += 1;
                match format {
                    PlaceholderFormat::Dollar => {
                        out.push('$');
                        out.push_str(&count.to_string());
                    }
                    PlaceholderFormat::Question => out.push('?'),
                }
            }
            _ => out.push(c),
        }
    }
    Ok((out, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollar_placeholders_are_numbered() {
        let stmt = Sql::new("SELECT id FROM templates WHERE name = ? AND category_id = ?")
            .bind("invoice")
            .bind(4i64);
        let (text, args) = stmt.to_sql(PlaceholderFormat::Dollar).unwrap();
        assert_eq!(text, "SELECT id FROM templates WHERE name = $1 AND category_id = $2");
        assert_eq!(args, vec![Value::Text("invoice".into()), Value::Int(4)]);
    }

    #[test]
    fn question_format_keeps_text() {
        let stmt = Sql::new("DELETE FROM templates WHERE id = ?").bind(9i64);
        let (text, _) = stmt.to_sql(PlaceholderFormat::Question).unwrap();
        assert_eq!(text, "DELETE FROM templates WHERE id = ?");
    }

    #[test]
    fn quoted_and_commented_marks_are_not_placeholders() {
        let stmt = Sql::new(
            "SELECT 'what?', \"odd?col\" FROM t -- really?\nWHERE a = ? AND b = 'it''s ?'",
        )
        .bind(1i64);
        let (text, args) = stmt.to_sql(PlaceholderFormat::Dollar).unwrap();
        assert_eq!(
            text,
            "SELECT 'what?', \"odd?col\" FROM t -- really?\nWHERE a = $1 AND b = 'it''s ?'"
        );
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn doubled_question_mark_is_literal() {
        let stmt = Sql::new("SELECT data ?? 'key' FROM docs WHERE id = ?").bind(1i64);
        let (text, _) = stmt.to_sql(PlaceholderFormat::Dollar).unwrap();
        assert_eq!(text, "SELECT data ? 'key' FROM docs WHERE id = $1");
    }

    #[test]
    fn doubled_question_mark_survives_question_format() {
        let stmt = Sql::new("SELECT data ?? 'key' FROM docs WHERE id = ?").bind(1i64);
        let (text, args) = stmt.to_sql(PlaceholderFormat::Question).unwrap();
        assert_eq!(text, "SELECT data ?? 'key' FROM docs WHERE id = ?");
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn argument_count_mismatch() {
        let stmt = Sql::new("INSERT INTO t (a, b) VALUES (?, ?)").bind(1i64);
        assert_eq!(
            stmt.to_sql(PlaceholderFormat::Dollar),
            Err(StatementError::ArgumentCount {
                placeholders: 2,
                arguments: 1
            })
        );
    }

    #[test]
    fn empty_and_unterminated() {
        assert_eq!(
            Sql::new("   ").to_sql(PlaceholderFormat::Dollar),
            Err(StatementError::Empty)
        );
        assert_eq!(
            Sql::new("SELECT 'oops").to_sql(PlaceholderFormat::Dollar),
            Err(StatementError::UnterminatedQuote('\''))
        );
    }

    #[test]
    fn option_values_map_to_typed_null() {
        assert_eq!(Value::from(None::<i64>), Value::NullOf(ValueKind::Int));
        assert_eq!(Value::from(None::<&str>), Value::NullOf(ValueKind::Text));
        assert_eq!(Value::from(None::<Vec<u8>>), Value::NullOf(ValueKind::Bytes));
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }
}
