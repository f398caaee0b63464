//! Migration history tracking.
//!
//! One row per applied script. Writes happen after the DDL transaction has
//! committed and are best-effort: the recorder reports failures, the engine
//! logs them, and the committed schema change stands.

use chrono::Utc;
use driftless_model::Dialect;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::connection::{SqlExecutor, SqlParam};
use crate::error::{MigrateResult, MigrationError};
use crate::script::MigrationScript;

/// A recorded script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Affected table.
    pub table_name: String,
    /// Operation tag.
    pub operation: String,
    /// SQL that was applied.
    pub sql_script: String,
    /// When the script was applied, as stored by the database.
    pub applied_at: String,
    /// Script description.
    pub description: Option<String>,
}

/// `CREATE TABLE` for the history table, idempotent on every dialect.
pub fn create_table_sql(dialect: Dialect, table: &str) -> String {
    let q = |name: &str| dialect.quote(name);
    let table_q = q(table);
    match dialect {
        Dialect::Sqlite => format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {} INTEGER PRIMARY KEY AUTOINCREMENT,\n    {} TEXT NOT NULL,\n    {} TEXT NOT NULL,\n    {} TEXT NOT NULL,\n    {} TEXT NOT NULL,\n    {} TEXT\n)",
            table_q,
            q("Id"),
            q("TableName"),
            q("Operation"),
            q("SqlScript"),
            q("AppliedAt"),
            q("Description")
        ),
        Dialect::MySql => format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {} BIGINT NOT NULL AUTO_INCREMENT,\n    {} VARCHAR(255) NOT NULL,\n    {} VARCHAR(32) NOT NULL,\n    {} LONGTEXT NOT NULL,\n    {} DATETIME(6) NOT NULL,\n    {} TEXT NULL,\n    PRIMARY KEY ({})\n)",
            table_q,
            q("Id"),
            q("TableName"),
            q("Operation"),
            q("SqlScript"),
            q("AppliedAt"),
            q("Description"),
            q("Id")
        ),
        Dialect::PostgreSql => format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {} BIGSERIAL PRIMARY KEY,\n    {} VARCHAR(255) NOT NULL,\n    {} VARCHAR(32) NOT NULL,\n    {} TEXT NOT NULL,\n    {} TIMESTAMPTZ NOT NULL,\n    {} TEXT\n)",
            table_q,
            q("Id"),
            q("TableName"),
            q("Operation"),
            q("SqlScript"),
            q("AppliedAt"),
            q("Description")
        ),
        Dialect::SqlServer => format!(
            "IF OBJECT_ID({}, N'U') IS NULL\nCREATE TABLE {} (\n    {} BIGINT IDENTITY(1,1) NOT NULL PRIMARY KEY,\n    {} NVARCHAR(255) NOT NULL,\n    {} NVARCHAR(32) NOT NULL,\n    {} NVARCHAR(MAX) NOT NULL,\n    {} DATETIME2 NOT NULL,\n    {} NVARCHAR(MAX) NULL\n)",
            dialect.string_literal(&table_q),
            table_q,
            q("Id"),
            q("TableName"),
            q("Operation"),
            q("SqlScript"),
            q("AppliedAt"),
            q("Description")
        ),
    }
}

/// Parameterized `INSERT` of one history row.
pub fn insert_sql(dialect: Dialect, table: &str) -> String {
    let columns = ["TableName", "Operation", "SqlScript", "AppliedAt", "Description"];
    let names: Vec<String> = columns.iter().map(|c| dialect.quote(c)).collect();
    let values: Vec<String> = (1..=columns.len()).map(|i| dialect.placeholder(i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dialect.quote(table),
        names.join(", "),
        values.join(", ")
    )
}

/// Writes history rows through a connection.
pub struct HistoryRecorder<'a> {
    conn: &'a dyn SqlExecutor,
    dialect: Dialect,
    table: String,
}

impl<'a> HistoryRecorder<'a> {
    /// Create a recorder for `table`.
    pub fn new(conn: &'a dyn SqlExecutor, dialect: Dialect, table: impl Into<String>) -> Self {
        Self {
            conn,
            dialect,
            table: table.into(),
        }
    }

    /// Create the history table if it does not exist.
    pub async fn ensure_table(&self) -> MigrateResult<()> {
        self.conn
            .execute(&create_table_sql(self.dialect, &self.table), &[])
            .await
            .map_err(|e| MigrationError::history(format!("cannot create {}: {}", self.table, e)))?;
        Ok(())
    }

    /// Append one row per script. Returns the number of rows written.
    pub async fn record(&self, scripts: &[MigrationScript]) -> MigrateResult<usize> {
        self.ensure_table().await?;

        let sql = insert_sql(self.dialect, &self.table);
        let applied_at = Utc::now();
        for script in scripts {
            let params = [
                SqlParam::from(script.table_name.as_str()),
                SqlParam::from(script.operation.as_str()),
                SqlParam::from(script.sql.as_str()),
                SqlParam::Timestamp(applied_at),
                SqlParam::from(script.description.as_str()),
            ];
            self.conn
                .execute(&sql, &params)
                .await
                .map_err(|e| MigrationError::history(e.to_string()))?;
        }

        debug!(table = %self.table, rows = scripts.len(), "Recorded history");
        Ok(scripts.len())
    }

    /// Read every recorded row, oldest first.
    pub async fn entries(&self) -> MigrateResult<Vec<HistoryRecord>> {
        let q = |name: &str| self.dialect.quote(name);
        let sql = format!(
            "SELECT {}, {}, {}, {} AS {}, {} FROM {} ORDER BY {}",
            q("TableName"),
            q("Operation"),
            q("SqlScript"),
            self.applied_at_text(),
            q("AppliedAt"),
            q("Description"),
            q(&self.table),
            q("Id")
        );

        let rows = self
            .conn
            .query(&sql, &[])
            .await
            .map_err(|e| MigrationError::history(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| HistoryRecord {
                table_name: row.get_string("TableName").unwrap_or_default(),
                operation: row.get_string("Operation").unwrap_or_default(),
                sql_script: row.get_string("SqlScript").unwrap_or_default(),
                applied_at: row.get_string("AppliedAt").unwrap_or_default(),
                description: row.get_string("Description"),
            })
            .collect())
    }

    /// `AppliedAt` cast to text so every adapter can read it.
    fn applied_at_text(&self) -> String {
        let column = self.dialect.quote("AppliedAt");
        match self.dialect {
            Dialect::Sqlite => column,
            Dialect::MySql => format!("CAST({} AS CHAR)", column),
            Dialect::PostgreSql => format!("{}::text", column),
            Dialect::SqlServer => format!("CONVERT(NVARCHAR(40), {}, 126)", column),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Operation;
    use crate::testing::{Event, RecordingExecutor};

    #[test]
    fn test_create_table_sql() {
        let sqlite = create_table_sql(Dialect::Sqlite, "_driftless_history");
        assert!(sqlite.starts_with("CREATE TABLE IF NOT EXISTS \"_driftless_history\""));
        assert!(sqlite.contains("\"Id\" INTEGER PRIMARY KEY AUTOINCREMENT"));

        let mssql = create_table_sql(Dialect::SqlServer, "_driftless_history");
        assert!(mssql.starts_with("IF OBJECT_ID(N'[_driftless_history]', N'U') IS NULL"));

        let pg = create_table_sql(Dialect::PostgreSql, "history");
        assert!(pg.contains("\"AppliedAt\" TIMESTAMPTZ NOT NULL"));
    }

    #[test]
    fn test_insert_placeholders() {
        assert_eq!(
            insert_sql(Dialect::PostgreSql, "h"),
            "INSERT INTO \"h\" (\"TableName\", \"Operation\", \"SqlScript\", \"AppliedAt\", \"Description\") VALUES ($1, $2, $3, $4, $5)"
        );
        assert!(insert_sql(Dialect::MySql, "h").ends_with("VALUES (?, ?, ?, ?, ?)"));
        assert!(insert_sql(Dialect::SqlServer, "h").ends_with("VALUES (@P1, @P2, @P3, @P4, @P5)"));
    }

    #[tokio::test]
    async fn test_record_rows() {
        let conn = RecordingExecutor::new("postgres");
        let recorder = HistoryRecorder::new(&conn, Dialect::PostgreSql, "_driftless_history");
        let scripts = vec![MigrationScript::new(
            "Order",
            Operation::CreateTable,
            "CREATE TABLE \"Order\" (\"Id\" INTEGER)",
            "Create table Order",
        )];

        assert_eq!(recorder.record(&scripts).await.unwrap(), 1);

        let events = conn.events();
        assert_eq!(events.len(), 2);
        match &events[1] {
            Event::Execute(sql, params) => {
                assert!(sql.starts_with("INSERT INTO \"_driftless_history\""));
                assert_eq!(params[0], SqlParam::Text("Order".into()));
                assert_eq!(params[1], SqlParam::Text("CreateTable".into()));
                assert!(matches!(params[3], SqlParam::Timestamp(_)));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failure_is_history_error() {
        let conn = RecordingExecutor::new("sqlite").fail_on("INSERT INTO");
        let recorder = HistoryRecorder::new(&conn, Dialect::Sqlite, "_driftless_history");
        let scripts = vec![MigrationScript::new("a", Operation::DropTable, "DROP TABLE a", "Drop table a")];

        let err = recorder.record(&scripts).await.unwrap_err();
        assert!(matches!(err, MigrationError::History(_)));
    }
}
