//! Type conversion utilities for SQLite.

use chrono::SecondsFormat;
use driftless_migrate::SqlParam;
use rusqlite::types::{Value, ValueRef};
use serde_json::Value as JsonValue;

/// Convert a bind parameter to a SQLite value. Timestamps are stored as
/// RFC 3339 text, which sorts chronologically.
pub fn to_sqlite_value(param: &SqlParam) -> Value {
    match param {
        SqlParam::Null => Value::Null,
        SqlParam::Bool(b) => Value::Integer(i64::from(*b)),
        SqlParam::Int(i) => Value::Integer(*i),
        SqlParam::Text(s) => Value::Text(s.clone()),
        SqlParam::Timestamp(t) => Value::Text(t.to_rfc3339_opts(SecondsFormat::Micros, true)),
    }
}

/// Convert a SQLite value to JSON. Blobs that are not UTF-8 become hex.
pub fn from_sqlite_value(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(i) => JsonValue::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ValueRef::Text(bytes) => JsonValue::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) => JsonValue::String(s.to_string()),
            Err(_) => JsonValue::String(hex::encode(bytes)),
        },
    }
}

/// Get a JSON value from a row at the given column index.
pub fn get_value_at_index(row: &rusqlite::Row<'_>, index: usize) -> JsonValue {
    row.get_ref(index)
        .map(from_sqlite_value)
        .unwrap_or(JsonValue::Null)
}
