//! The SQL execution capability consumed by the engine.
//!
//! The engine never opens connections itself. Callers hand it a
//! [`SqlExecutor`] bound to a single connection; adapters exist for SQLite
//! and PostgreSQL, other drivers only need to implement the trait.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use driftless_model::same_ident;
use serde_json::Value;

use crate::error::MigrateResult;

/// A bind parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// Text value.
    Text(String),
    /// Integer value.
    Int(i64),
    /// Boolean value.
    Bool(bool),
    /// UTC timestamp.
    Timestamp(DateTime<Utc>),
    /// SQL NULL.
    Null,
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for SqlParam {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for SqlParam {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<SqlParam>> From<Option<T>> for SqlParam {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A result row: column names in select order mapped to JSON values.
///
/// Lookups are case-insensitive since catalogs disagree on the case of
/// the column names they report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.push((name.into(), value.into()));
        self
    }

    /// Append a column in place.
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.columns.push((name.into(), value));
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Raw value of a column. NULL is reported as `None`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(column, _)| same_ident(column, name))
            .map(|(_, value)| value)
            .filter(|value| !value.is_null())
    }

    /// Value of the first column.
    pub fn first(&self) -> Option<&Value> {
        self.columns.first().map(|(_, value)| value)
    }

    /// Column as a string. Numbers and booleans are rendered.
    pub fn get_string(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Column as an integer. Numeric strings are parsed.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        value_as_i64(self.get(name)?)
    }

    /// Column as a boolean. Accepts `1`/`0`, `YES`/`NO` and `true`/`false`.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "yes" | "y" | "true" | "t" | "1" => Some(true),
                "no" | "n" | "false" | "f" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl From<serde_json::Map<String, Value>> for Row {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Self {
            columns: map.into_iter().collect(),
        }
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|n| i64::try_from(n).ok()))
            .or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// SQL execution capability bound to one connection.
///
/// Transactions are connection state: `begin` opens one on the bound
/// connection and every later call runs inside it until `commit` or
/// `rollback`.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Provider identity, used to resolve the dialect.
    fn provider(&self) -> &str;

    /// Stable identity of the target database (URL without credentials,
    /// file path, ...). Keys the advisory lock.
    fn database_identity(&self) -> String;

    /// Path of the database file, for file-backed databases.
    fn database_file(&self) -> Option<PathBuf> {
        None
    }

    /// Execute a statement, returning the affected row count.
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> MigrateResult<u64>;

    /// Run a query and collect its rows.
    async fn query(&self, sql: &str, params: &[SqlParam]) -> MigrateResult<Vec<Row>>;

    /// Open a transaction.
    async fn begin(&self) -> MigrateResult<()>;

    /// Commit the open transaction.
    async fn commit(&self) -> MigrateResult<()>;

    /// Roll back the open transaction.
    async fn rollback(&self) -> MigrateResult<()>;

    /// Pre-flight connectivity check.
    async fn ping(&self) -> MigrateResult<()> {
        self.query("SELECT 1", &[]).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_accessors_case_insensitive() {
        let row = Row::new()
            .with("COLUMN_NAME", "Total")
            .with("numeric_precision", json!(10))
            .with("IS_NULLABLE", "YES")
            .with("pk", json!(0))
            .with("max_length", json!("255"))
            .with("extra", Value::Null);

        assert_eq!(row.get_string("column_name").as_deref(), Some("Total"));
        assert_eq!(row.get_i64("NUMERIC_PRECISION"), Some(10));
        assert_eq!(row.get_i64("max_length"), Some(255));
        assert_eq!(row.get_bool("is_nullable"), Some(true));
        assert_eq!(row.get_bool("pk"), Some(false));
        assert_eq!(row.get("extra"), None);
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.len(), 6);
    }

    #[test]
    fn test_param_conversions() {
        assert_eq!(SqlParam::from("x"), SqlParam::Text("x".into()));
        assert_eq!(SqlParam::from(Some(5_i64)), SqlParam::Int(5));
        assert_eq!(SqlParam::from(None::<String>), SqlParam::Null);
    }
}
