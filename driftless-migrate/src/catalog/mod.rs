//! Database catalog readers.
//!
//! Each dialect reads its system catalog into live [`TableDefinition`]s.
//! Readers only run queries; they never change the schema. System tables
//! and the engine's own history table are skipped.

mod mssql;
mod mysql;
mod postgres;
mod sqlite;

pub use mssql::MssqlCatalog;
pub use mysql::MySqlCatalog;
pub use postgres::PostgresCatalog;
pub use sqlite::SqliteCatalog;

use async_trait::async_trait;
use driftless_model::{ColumnDefinition, Dialect, TableDefinition, same_ident};

use crate::capability::ServerVersion;
use crate::connection::{Row, SqlExecutor};
use crate::error::{MigrateResult, MigrationError};

/// Tables a reader skips.
#[derive(Debug, Clone)]
pub struct CatalogFilter {
    /// Table names to skip, compared case-insensitively.
    pub exclude_tables: Vec<String>,
}

impl CatalogFilter {
    /// Skip the history table.
    pub fn new(history_table: impl Into<String>) -> Self {
        Self {
            exclude_tables: vec![history_table.into()],
        }
    }

    /// Skip an additional table.
    pub fn exclude(mut self, table: impl Into<String>) -> Self {
        self.exclude_tables.push(table.into());
        self
    }

    /// Check if a table should be read.
    pub fn should_include_table(&self, name: &str) -> bool {
        !self.exclude_tables.iter().any(|t| same_ident(t, name))
    }
}

/// Reads live tables from a database catalog.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Dialect of the catalog.
    fn dialect(&self) -> Dialect;

    /// Read every user table with its columns.
    async fn read_catalog(
        &self,
        conn: &dyn SqlExecutor,
        filter: &CatalogFilter,
    ) -> MigrateResult<Vec<TableDefinition>>;

    /// Query the server version. `None` if it cannot be parsed.
    async fn server_version(&self, conn: &dyn SqlExecutor) -> MigrateResult<Option<ServerVersion>>;
}

/// The catalog reader for a dialect.
pub fn reader_for(dialect: Dialect) -> Box<dyn CatalogReader> {
    match dialect {
        Dialect::Sqlite => Box::new(SqliteCatalog),
        Dialect::MySql => Box::new(MySqlCatalog),
        Dialect::PostgreSql => Box::new(PostgresCatalog),
        Dialect::SqlServer => Box::new(MssqlCatalog),
    }
}

/// Run a catalog query, reporting failures as introspection errors.
pub(crate) async fn catalog_query(conn: &dyn SqlExecutor, sql: &str) -> MigrateResult<Vec<Row>> {
    conn.query(sql, &[])
        .await
        .map_err(|e| MigrationError::introspection(e.to_string()))
}

/// Run a single-value version query.
pub(crate) async fn version_query(
    conn: &dyn SqlExecutor,
    sql: &str,
) -> MigrateResult<Option<ServerVersion>> {
    let rows = catalog_query(conn, sql).await?;
    let version = rows
        .first()
        .and_then(|row| row.get_string("version"))
        .and_then(|v| ServerVersion::parse(&v));
    Ok(version)
}

/// Tables collected in catalog order, addressed by schema and name.
#[derive(Debug, Default)]
pub(crate) struct TableSet {
    tables: Vec<TableDefinition>,
}

impl TableSet {
    pub(crate) fn insert(&mut self, schema: Option<String>, name: String) {
        if self.position(schema.as_deref(), &name).is_none() {
            let mut table = TableDefinition::new(name);
            table.schema = schema;
            self.tables.push(table);
        }
    }

    /// Append a column to a known table. Columns of unknown tables (views,
    /// excluded tables) are ignored.
    pub(crate) fn push_column(&mut self, schema: Option<&str>, table: &str, column: ColumnDefinition) {
        if let Some(index) = self.position(schema, table) {
            self.tables[index].columns.push(column);
        }
    }

    /// Mark a column as part of the primary key.
    pub(crate) fn mark_primary_key(&mut self, schema: Option<&str>, table: &str, column: &str) {
        let Some(index) = self.position(schema, table) else {
            return;
        };
        if let Some(column) = self.tables[index]
            .columns
            .iter_mut()
            .find(|c| c.name == column)
        {
            column.primary_key = true;
            column.nullable = false;
        }
    }

    pub(crate) fn into_tables(self) -> Vec<TableDefinition> {
        self.tables
    }

    fn position(&self, schema: Option<&str>, name: &str) -> Option<usize> {
        self.tables
            .iter()
            .position(|t| t.schema.as_deref() == schema && t.name == name)
    }
}

/// Non-negative integer column as `u64`.
pub(crate) fn row_u64(row: &Row, name: &str) -> Option<u64> {
    row.get_i64(name).and_then(|n| u64::try_from(n).ok())
}

/// Non-negative integer column as `u32`.
pub(crate) fn row_u32(row: &Row, name: &str) -> Option<u32> {
    row.get_i64(name).and_then(|n| u32::try_from(n).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter() {
        let filter = CatalogFilter::new("_driftless_history").exclude("sysdiagrams");
        assert!(!filter.should_include_table("_DRIFTLESS_HISTORY"));
        assert!(!filter.should_include_table("sysdiagrams"));
        assert!(filter.should_include_table("Order"));
    }

    #[test]
    fn test_table_set() {
        let mut set = TableSet::default();
        set.insert(Some("public".into()), "orders".into());
        set.insert(Some("public".into()), "orders".into());
        set.push_column(Some("public"), "orders", ColumnDefinition::new("id", "integer"));
        set.push_column(Some("public"), "view_only", ColumnDefinition::new("id", "integer"));
        set.mark_primary_key(Some("public"), "orders", "id");

        let tables = set.into_tables();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].columns.len(), 1);
        assert!(tables[0].columns[0].primary_key);
        assert!(!tables[0].columns[0].nullable);
    }
}
