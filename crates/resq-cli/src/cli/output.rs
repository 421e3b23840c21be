//! Rendering rows of unknown shape for the terminal.

use serde_json::{Map, Value as Json};
use sqlx::any::AnyRow;
use sqlx::{Column, Row};

/// Decode column `i`, trying the types the `Any` driver can produce.
pub(crate) fn cell(row: &AnyRow, i: usize) -> Json {
    if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
        return v.map_or(Json::Null, Json::from);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
        return v.map_or(Json::Null, Json::from);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
        return v.map_or(Json::Null, Json::from);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(i) {
        return v.map_or(Json::Null, Json::from);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(i) {
        return v.map_or(Json::Null, |b| Json::String(format!("<{} bytes>", b.len())));
    }
    Json::Null
}

pub(crate) fn header(row: &AnyRow) -> String {
    row.columns()
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join("\t")
}

pub(crate) fn row_to_tsv(row: &AnyRow) -> String {
    (0..row.len())
        .map(|i| match cell(row, i) {
            Json::Null => "NULL".to_string(),
            Json::String(s) => s,
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\t")
}

pub(crate) fn row_to_json(row: &AnyRow) -> Map<String, Json> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name().to_string(), cell(row, i)))
        .collect()
}
