//! SQL Server catalog reader.

use async_trait::async_trait;
use driftless_model::{ColumnDefinition, Dialect, TableDefinition};
use tracing::debug;

use super::{CatalogFilter, CatalogReader, TableSet, catalog_query, row_u32, version_query};
use crate::capability::ServerVersion;
use crate::connection::SqlExecutor;
use crate::error::MigrateResult;

/// Catalog queries for SQL Server.
pub mod queries {
    /// Base tables outside the `sys` schema.
    pub const TABLES: &str = r#"
SELECT TABLE_SCHEMA AS table_schema, TABLE_NAME AS table_name
FROM INFORMATION_SCHEMA.TABLES
WHERE TABLE_TYPE = 'BASE TABLE' AND TABLE_SCHEMA <> 'sys'
ORDER BY TABLE_SCHEMA, TABLE_NAME
"#;

    /// Columns with identity flags, in ordinal order.
    pub const COLUMNS: &str = r#"
SELECT
    c.TABLE_SCHEMA AS table_schema,
    c.TABLE_NAME AS table_name,
    c.COLUMN_NAME AS column_name,
    c.DATA_TYPE AS data_type,
    c.IS_NULLABLE AS is_nullable,
    c.CHARACTER_MAXIMUM_LENGTH AS character_maximum_length,
    CAST(c.NUMERIC_PRECISION AS INT) AS numeric_precision,
    c.NUMERIC_SCALE AS numeric_scale,
    COLUMNPROPERTY(OBJECT_ID(QUOTENAME(c.TABLE_SCHEMA) + '.' + QUOTENAME(c.TABLE_NAME)),
        c.COLUMN_NAME, 'IsIdentity') AS is_identity
FROM INFORMATION_SCHEMA.COLUMNS c
ORDER BY c.TABLE_SCHEMA, c.TABLE_NAME, c.ORDINAL_POSITION
"#;

    /// Primary key columns.
    pub const PRIMARY_KEYS: &str = r#"
SELECT
    kcu.TABLE_SCHEMA AS table_schema,
    kcu.TABLE_NAME AS table_name,
    kcu.COLUMN_NAME AS column_name
FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
    ON tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
    AND tc.TABLE_SCHEMA = kcu.TABLE_SCHEMA
    AND tc.TABLE_NAME = kcu.TABLE_NAME
WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY'
ORDER BY kcu.TABLE_SCHEMA, kcu.TABLE_NAME, kcu.ORDINAL_POSITION
"#;

    /// Product version.
    pub const VERSION: &str =
        "SELECT CAST(SERVERPROPERTY('ProductVersion') AS NVARCHAR(128)) AS version";
}

/// Tables SQL Server creates for its own tooling.
const SYSTEM_TABLES: &[&str] = &["sysdiagrams"];

/// Reads SQL Server's `INFORMATION_SCHEMA`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlCatalog;

#[async_trait]
impl CatalogReader for MssqlCatalog {
    fn dialect(&self) -> Dialect {
        Dialect::SqlServer
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
            let system = SYSTEM_TABLES.iter().any(|t| t.eq_ignore_ascii_case(&name));
            if !system && filter.should_include_table(&name) {
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

            let length = row.get_i64("character_maximum_length");
            let mut column = match length {
                // -1 marks the MAX variants
                Some(-1) => ColumnDefinition::new(name, format!("{}(max)", data_type)),
                _ => ColumnDefinition::new(name, data_type),
            };
            column.nullable = row.get_bool("is_nullable").unwrap_or(true);
            column.identity = row.get_bool("is_identity").unwrap_or(false);
            column.max_length = length.and_then(|n| u64::try_from(n).ok());
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
        debug!(tables = tables.len(), "Read SQL Server catalog");
        Ok(tables)
    }

    async fn server_version(&self, conn: &dyn SqlExecutor) -> MigrateResult<Option<ServerVersion>> {
        version_query(conn, queries::VERSION).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Row;
    use crate::testing::RecordingExecutor;
    use serde_json::json;

    #[tokio::test]
    async fn test_read_catalog() {
        let exec = RecordingExecutor::new("sqlserver")
            .respond(
                "INFORMATION_SCHEMA.TABLES",
                vec![
                    Row::new().with("table_schema", "dbo").with("table_name", "Order"),
                    Row::new().with("table_schema", "dbo").with("table_name", "sysdiagrams"),
                ],
            )
            .respond(
                "INFORMATION_SCHEMA.COLUMNS",
                vec![
                    Row::new()
                        .with("table_schema", "dbo")
                        .with("table_name", "Order")
                        .with("column_name", "Id")
                        .with("data_type", "int")
                        .with("is_nullable", "NO")
                        .with("numeric_precision", json!(10))
                        .with("numeric_scale", json!(0))
                        .with("is_identity", json!(1)),
                    Row::new()
                        .with("table_schema", "dbo")
                        .with("table_name", "Order")
                        .with("column_name", "Notes")
                        .with("data_type", "nvarchar")
                        .with("is_nullable", "YES")
                        .with("character_maximum_length", json!(-1))
                        .with("is_identity", json!(0)),
                ],
            )
            .respond(
                "PRIMARY KEY",
                vec![
                    Row::new()
                        .with("table_schema", "dbo")
                        .with("table_name", "Order")
                        .with("column_name", "Id"),
                ],
            );

        let tables = MssqlCatalog
            .read_catalog(&exec, &CatalogFilter::new("_driftless_history"))
            .await
            .unwrap();

        assert_eq!(tables.len(), 1);
        let order = &tables[0];
        let id = order.find_column("Id").unwrap();
        assert!(id.primary_key && id.identity && !id.nullable);

        let notes = order.find_column("Notes").unwrap();
        assert_eq!(notes.data_type, "nvarchar(max)");
        assert_eq!(notes.max_length, None);
    }
}
