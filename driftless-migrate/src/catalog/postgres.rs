//! PostgreSQL catalog reader.

use async_trait::async_trait;
use driftless_model::{ColumnDefinition, Dialect, TableDefinition};
use tracing::debug;

use super::{CatalogFilter, CatalogReader, TableSet, catalog_query, row_u32, row_u64, version_query};
use crate::capability::ServerVersion;
use crate::connection::SqlExecutor;
use crate::error::MigrateResult;

/// Catalog queries for PostgreSQL.
///
/// Every column is cast to a plain type so drivers need no special
/// handling for `information_schema` domains.
pub mod queries {
    /// Base tables outside the system schemas.
    pub const TABLES: &str = r#"
SELECT table_schema::text AS table_schema, table_name::text AS table_name
FROM information_schema.tables
WHERE table_type = 'BASE TABLE'
  AND table_schema NOT IN ('pg_catalog', 'information_schema')
  AND table_schema NOT LIKE 'pg_toast%'
ORDER BY table_schema, table_name
"#;

    /// Columns outside the system schemas, in ordinal order.
    pub const COLUMNS: &str = r#"
SELECT
    table_schema::text AS table_schema,
    table_name::text AS table_name,
    column_name::text AS column_name,
    data_type::text AS data_type,
    is_nullable::text AS is_nullable,
    character_maximum_length::int AS character_maximum_length,
    numeric_precision::int AS numeric_precision,
    numeric_scale::int AS numeric_scale,
    column_default::text AS column_default,
    is_identity::text AS is_identity
FROM information_schema.columns
WHERE table_schema NOT IN ('pg_catalog', 'information_schema')
  AND table_schema NOT LIKE 'pg_toast%'
ORDER BY table_schema, table_name, ordinal_position
"#;

    /// Primary key columns.
    pub const PRIMARY_KEYS: &str = r#"
SELECT
    kcu.table_schema::text AS table_schema,
    kcu.table_name::text AS table_name,
    kcu.column_name::text AS column_name
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
    ON tc.constraint_name = kcu.constraint_name
    AND tc.table_schema = kcu.table_schema
    AND tc.table_name = kcu.table_name
WHERE tc.constraint_type = 'PRIMARY KEY'
ORDER BY kcu.table_schema, kcu.table_name, kcu.ordinal_position
"#;

    /// Server version.
    pub const VERSION: &str = "SELECT current_setting('server_version') AS version";
}

/// Reads PostgreSQL's `information_schema`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresCatalog;

#[async_trait]
impl CatalogReader for PostgresCatalog {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSql
    }

    async fn read_catalog(
        &self,
        conn: &dyn SqlExecutor,
        filter: &CatalogFilter,
    ) -> MigrateResult<Vec<TableDefinition>> {
        let mut set = TableSet::default();

        for row in catalog_query(conn, queries::TABLES).await? {
            let Some(name) = row.get_string("table_name") else {
                continue;
            };
            if filter.should_include_table(&name) {
                set.insert(row.get_string("table_schema"), name);
            }
        }

        for row in catalog_query(conn, queries::COLUMNS).await? {
            let (Some(table), Some(name), Some(data_type)) = (
                row.get_string("table_name"),
                row.get_string("column_name"),
                row.get_string("data_type"),
            ) else {
                continue;
            };

            let serial = row
                .get_string("column_default")
                .is_some_and(|d| d.starts_with("nextval("));

            let mut column = ColumnDefinition::new(name, data_type);
            column.nullable = row.get_bool("is_nullable").unwrap_or(true);
            column.identity = row.get_bool("is_identity").unwrap_or(false) || serial;
            column.max_length = row_u64(&row, "character_maximum_length");
            column.precision = row_u32(&row, "numeric_precision");
            column.scale = row_u32(&row, "numeric_scale");

            set.push_column(row.get_string("table_schema").as_deref(), &table, column);
        }

        for row in catalog_query(conn, queries::PRIMARY_KEYS).await? {
            if let (Some(table), Some(column)) =
                (row.get_string("table_name"), row.get_string("column_name"))
            {
                set.mark_primary_key(row.get_string("table_schema").as_deref(), &table, &column);
            }
        }

        let tables = set.into_tables();
        debug!(tables = tables.len(), "Read PostgreSQL catalog");
        Ok(tables)
    }

    async fn server_version(&self, conn: &dyn SqlExecutor) -> MigrateResult<Option<ServerVersion>> {
        version_query(conn, queries::VERSION).await
    }
}
