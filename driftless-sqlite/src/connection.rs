//! SQLite connection wrapper.

use std::path::PathBuf;

use async_trait::async_trait;
use driftless_migrate::{MigrateResult, Row, SqlExecutor, SqlParam};
use tokio_rusqlite::Connection;
use tracing::{debug, trace};

use crate::config::{DatabasePath, SqliteConfig};
use crate::error::{SqliteError, SqliteResult};
use crate::types::{get_value_at_index, to_sqlite_value};

/// A single SQLite connection exposed as a [`SqlExecutor`].
///
/// Statements run on the connection's background thread. Transactions are
/// connection state, so every call between `begin` and `commit` joins the
/// open transaction.
pub struct SqliteExecutor {
    conn: Connection,
    config: SqliteConfig,
}

impl SqliteExecutor {
    /// Open a connection and apply the configured pragmas.
    pub async fn open(config: SqliteConfig) -> SqliteResult<Self> {
        let conn = match &config.path {
            DatabasePath::Memory => Connection::open_in_memory().await?,
            DatabasePath::File(path) => Connection::open(path.clone()).await?,
        };

        let init = config.init_sql();
        conn.call(move |c| {
            c.execute_batch(&init)?;
            Ok(())
        })
        .await?;

        debug!(database = %config.path.identity(), "Opened SQLite connection");
        Ok(Self { conn, config })
    }

    /// Open a private in-memory database.
    pub async fn memory() -> SqliteResult<Self> {
        Self::open(SqliteConfig::memory()).await
    }

    /// Open a file-backed database, creating it if missing.
    pub async fn file(path: impl Into<PathBuf>) -> SqliteResult<Self> {
        Self::open(SqliteConfig::file(path.into())).await
    }

    /// Open from a URL such as `sqlite://app.db`.
    pub async fn connect(url: &str) -> SqliteResult<Self> {
        Self::open(SqliteConfig::from_url(url)?).await
    }

    /// The configuration this connection was opened with.
    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Run a batch of statements without parameters.
    pub async fn execute_batch(&self, sql: &str) -> SqliteResult<()> {
        let sql = sql.to_string();
        trace!(sql = %sql, "Executing batch");
        self.conn
            .call(move |c| {
                c.execute_batch(&sql)?;
                Ok(())
            })
            .await
            .map_err(SqliteError::from)
    }

    async fn execute_params(&self, sql: &str, params: &[SqlParam]) -> SqliteResult<u64> {
        let sql = sql.to_string();
        let values: Vec<rusqlite::types::Value> = params.iter().map(to_sqlite_value).collect();
        debug!(sql = %sql, params = values.len(), "Executing statement");

        self.conn
            .call(move |c| {
                let mut stmt = c.prepare(&sql)?;
                let affected = stmt.execute(rusqlite::params_from_iter(values.iter()))?;
                Ok(affected as u64)
            })
            .await
            .map_err(SqliteError::from)
    }

    async fn query_params(&self, sql: &str, params: &[SqlParam]) -> SqliteResult<Vec<Row>> {
        let sql = sql.to_string();
        let values: Vec<rusqlite::types::Value> = params.iter().map(to_sqlite_value).collect();
        debug!(sql = %sql, params = values.len(), "Executing query");

        self.conn
            .call(move |c| {
                let mut stmt = c.prepare(&sql)?;
                let columns: Vec<String> =
                    stmt.column_names().iter().map(|s| s.to_string()).collect();

                let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), |row| {
                    Ok(columns
                        .iter()
                        .enumerate()
                        .map(|(i, col)| (col.clone(), get_value_at_index(row, i)))
                        .collect::<Row>())
                })?;

                let results: Result<Vec<_>, _> = rows.collect();
                Ok(results?)
            })
            .await
            .map_err(SqliteError::from)
    }
}

#[async_trait]
impl SqlExecutor for SqliteExecutor {
    fn provider(&self) -> &str {
        "sqlite"
    }

    fn database_identity(&self) -> String {
        self.config.path.identity()
    }

    fn database_file(&self) -> Option<PathBuf> {
        self.config.path.file().map(|path| path.to_path_buf())
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> MigrateResult<u64> {
        Ok(self.execute_params(sql, params).await?)
    }

    async fn query(&self, sql: &str, params: &[SqlParam]) -> MigrateResult<Vec<Row>> {
        Ok(self.query_params(sql, params).await?)
    }

    async fn begin(&self) -> MigrateResult<()> {
        Ok(self.execute_batch("BEGIN IMMEDIATE").await?)
    }

    async fn commit(&self) -> MigrateResult<()> {
        Ok(self.execute_batch("COMMIT").await?)
    }

    async fn rollback(&self) -> MigrateResult<()> {
        Ok(self.execute_batch("ROLLBACK").await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_execute_and_query() {
        let conn = SqliteExecutor::memory().await.unwrap();
        conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)", &[])
            .await
            .unwrap();

        let affected = conn
            .execute("INSERT INTO t (name) VALUES (?1)", &[SqlParam::from("a")])
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let rows = conn
            .query("SELECT id, name FROM t WHERE name = ?1", &[SqlParam::from("a")])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_i64("ID"), Some(1));
        assert_eq!(rows[0].get_string("name").as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_rollback_discards_changes() {
        let conn = SqliteExecutor::memory().await.unwrap();
        conn.execute("CREATE TABLE t (id INTEGER)", &[]).await.unwrap();

        conn.begin().await.unwrap();
        conn.execute("INSERT INTO t VALUES (1)", &[]).await.unwrap();
        conn.rollback().await.unwrap();

        let rows = conn.query("SELECT COUNT(*) AS n FROM t", &[]).await.unwrap();
        assert_eq!(rows[0].get_i64("n"), Some(0));
    }

    #[tokio::test]
    async fn test_ddl_is_transactional() {
        let conn = SqliteExecutor::memory().await.unwrap();

        conn.begin().await.unwrap();
        conn.execute("CREATE TABLE t (id INTEGER)", &[]).await.unwrap();
        conn.rollback().await.unwrap();

        let rows = conn
            .query("SELECT name FROM sqlite_master WHERE type = 'table'", &[])
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_errors_map_to_database() {
        let conn = SqliteExecutor::memory().await.unwrap();
        let err = conn.execute("CREATE TABLE (", &[]).await.unwrap_err();
        assert!(matches!(err, driftless_migrate::MigrationError::Database(_)));
    }

    #[tokio::test]
    async fn test_file_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");
        let conn = SqliteExecutor::file(&path).await.unwrap();

        assert_eq!(conn.provider(), "sqlite");
        assert_eq!(conn.database_file(), Some(path));
        assert!(conn.database_identity().starts_with("sqlite://"));
        conn.ping().await.unwrap();

        let memory = SqliteExecutor::memory().await.unwrap();
        assert_eq!(memory.database_file(), None);
        assert_eq!(memory.database_identity(), "sqlite::memory:");
    }

    #[tokio::test]
    async fn test_timestamp_param() {
        let conn = SqliteExecutor::memory().await.unwrap();
        conn.execute("CREATE TABLE t (at TEXT)", &[]).await.unwrap();
        let at = chrono::Utc::now();
        conn.execute("INSERT INTO t VALUES (?1)", &[SqlParam::Timestamp(at)])
            .await
            .unwrap();

        let rows = conn.query("SELECT at FROM t", &[]).await.unwrap();
        let stored = rows[0].get_string("at").unwrap();
        assert!(stored.ends_with('Z'));
    }
}
