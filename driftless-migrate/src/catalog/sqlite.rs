//! SQLite catalog reader.

use async_trait::async_trait;
use driftless_model::{ColumnDefinition, Dialect, TableDefinition};
use tracing::debug;

use super::{CatalogFilter, CatalogReader, catalog_query, version_query};
use crate::capability::ServerVersion;
use crate::compat::RawType;
use crate::connection::SqlExecutor;
use crate::error::MigrateResult;

/// Catalog queries for SQLite.
pub mod queries {
    use driftless_model::Dialect;

    /// Attached databases: `main`, `temp` and any `ATTACH`ed file.
    pub const DATABASES: &str = "PRAGMA database_list";

    /// Library version.
    pub const VERSION: &str = "SELECT sqlite_version() AS version";

    /// User tables of one database with their CREATE statements.
    pub fn tables(database: &str) -> String {
        format!(
            "SELECT name, sql FROM {}.sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            Dialect::Sqlite.quote(database)
        )
    }

    /// Column listing for one table.
    pub fn table_info(database: &str, table: &str) -> String {
        format!(
            "PRAGMA {}.table_info({})",
            Dialect::Sqlite.quote(database),
            Dialect::Sqlite.quote(table)
        )
    }
}

/// Name of the primary database.
const MAIN_DATABASE: &str = "main";

/// Reads `sqlite_master` and `PRAGMA table_info` of every attached database.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteCatalog;

impl SqliteCatalog {
    /// Attached database names, `main` first. The `temp` database holds no
    /// migrated tables and is skipped.
    async fn databases(conn: &dyn SqlExecutor) -> MigrateResult<Vec<String>> {
        let mut databases: Vec<String> = catalog_query(conn, queries::DATABASES)
            .await?
            .iter()
            .filter_map(|row| row.get_string("name"))
            .filter(|name| !name.eq_ignore_ascii_case("temp"))
            .collect();

        if !databases.iter().any(|name| name.eq_ignore_ascii_case(MAIN_DATABASE)) {
            databases.insert(0, MAIN_DATABASE.to_string());
        }
        Ok(databases)
    }

    async fn read_table(
        conn: &dyn SqlExecutor,
        database: &str,
        name: String,
        autoincrement: bool,
    ) -> MigrateResult<TableDefinition> {
        let info = catalog_query(conn, &queries::table_info(database, &name)).await?;
        let mut table = TableDefinition::new(name).in_schema(database);

        for col in &info {
            let Some(column_name) = col.get_string("name") else {
                continue;
            };
            let data_type = col.get_string("type").unwrap_or_default();
            let pk = col.get_i64("pk").unwrap_or(0) > 0;
            let not_null = col.get_bool("notnull").unwrap_or(false);
            let raw = RawType::parse(&data_type);

            let mut column = ColumnDefinition::new(column_name, data_type.clone());
            column.nullable = !not_null && !pk;
            column.primary_key = pk;
            column.max_length = raw.length();
            if raw.args.len() == 2 {
                (column.precision, column.scale) = raw.precision_scale();
            }
            table.columns.push(column);
        }

        mark_rowid_alias(&mut table, autoincrement);
        Ok(table)
    }
}

#[async_trait]
impl CatalogReader for SqliteCatalog {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn read_catalog(
        &self,
        conn: &dyn SqlExecutor,
        filter: &CatalogFilter,
    ) -> MigrateResult<Vec<TableDefinition>> {
        let mut tables = Vec::new();

        for database in Self::databases(conn).await? {
            for row in catalog_query(conn, &queries::tables(&database)).await? {
                let Some(name) = row.get_string("name") else {
                    continue;
                };
                if !filter.should_include_table(&name) {
                    continue;
                }
                let autoincrement = row
                    .get_string("sql")
                    .is_some_and(|sql| sql.to_ascii_uppercase().contains("AUTOINCREMENT"));

                let table = Self::read_table(conn, &database, name, autoincrement).await?;
                debug!(
                    database = %database,
                    table = %table.name,
                    columns = table.columns.len(),
                    "Read table"
                );
                tables.push(table);
            }
        }

        Ok(tables)
    }

    async fn server_version(&self, conn: &dyn SqlExecutor) -> MigrateResult<Option<ServerVersion>> {
        version_query(conn, queries::VERSION).await
    }
}

/// A lone `INTEGER PRIMARY KEY` column aliases the rowid and is generated by
/// the database, with or without `AUTOINCREMENT`.
fn mark_rowid_alias(table: &mut TableDefinition, autoincrement: bool) {
    let keys: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.primary_key)
        .map(|(i, _)| i)
        .collect();

    if let [index] = keys[..] {
        let column = &mut table.columns[index];
        if column.data_type.eq_ignore_ascii_case("INTEGER") || autoincrement {
            column.identity = true;
        }
    }
}
