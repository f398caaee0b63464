//! MySQL catalog reader.

use async_trait::async_trait;
use driftless_model::{ColumnDefinition, Dialect, TableDefinition};
use tracing::debug;

use super::{CatalogFilter, CatalogReader, TableSet, catalog_query, version_query};
use crate::capability::ServerVersion;
use crate::compat::RawType;
use crate::connection::SqlExecutor;
use crate::error::MigrateResult;

/// Catalog queries for MySQL.
pub mod queries {
    /// Base tables of the current database.
    pub const TABLES: &str = r#"
SELECT TABLE_SCHEMA AS table_schema, TABLE_NAME AS table_name
FROM information_schema.TABLES
WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE'
ORDER BY TABLE_NAME
"#;

    /// Columns of the current database, in ordinal order.
    pub const COLUMNS: &str = r#"
SELECT
    TABLE_SCHEMA AS table_schema,
    TABLE_NAME AS table_name,
    COLUMN_NAME AS column_name,
    COLUMN_TYPE AS column_type,
    IS_NULLABLE AS is_nullable,
    COLUMN_KEY AS column_key,
    EXTRA AS extra,
    NUMERIC_PRECISION AS numeric_precision,
    NUMERIC_SCALE AS numeric_scale
FROM information_schema.COLUMNS
WHERE TABLE_SCHEMA = DATABASE()
ORDER BY TABLE_NAME, ORDINAL_POSITION
"#;

    /// Server version.
    pub const VERSION: &str = "SELECT VERSION() AS version";
}

/// Reads `information_schema` of the current MySQL database.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlCatalog;

#[async_trait]
impl CatalogReader for MySqlCatalog {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
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
            let (Some(table), Some(name), Some(column_type)) = (
                row.get_string("table_name"),
                row.get_string("column_name"),
                row.get_string("column_type"),
            ) else {
                continue;
            };

            let raw = RawType::parse(&column_type);
            let primary_key = row
                .get_string("column_key")
                .is_some_and(|k| k.eq_ignore_ascii_case("PRI"));

            let mut column = ColumnDefinition::new(name, column_type.clone());
            column.nullable = row.get_bool("is_nullable").unwrap_or(true) && !primary_key;
            column.primary_key = primary_key;
            column.identity = row
                .get_string("extra")
                .is_some_and(|e| e.to_ascii_lowercase().contains("auto_increment"));
            // Text tiers are sized by the oracle; only explicit lengths count.
            if matches!(raw.name.as_str(), "CHAR" | "VARCHAR" | "BINARY" | "VARBINARY") {
                column.max_length = raw.length();
            }
            if matches!(raw.name.as_str(), "DECIMAL" | "NUMERIC") {
                column.precision = super::row_u32(&row, "numeric_precision");
                column.scale = super::row_u32(&row, "numeric_scale");
            }

            set.push_column(row.get_string("table_schema").as_deref(), &table, column);
        }

        let tables = set.into_tables();
        debug!(tables = tables.len(), "Read MySQL catalog");
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
    use serde_json::{Value, json};

    fn col(table: &str, name: &str, ty: &str, nullable: &str, key: &str, extra: &str) -> Row {
        Row::new()
            .with("table_schema", "shop")
            .with("table_name", table)
            .with("column_name", name)
            .with("column_type", ty)
            .with("is_nullable", nullable)
            .with("column_key", key)
            .with("extra", extra)
            .with("numeric_precision", if ty.starts_with("decimal") { json!(10) } else { Value::Null })
            .with("numeric_scale", if ty.starts_with("decimal") { json!(2) } else { Value::Null })
    }

    #[tokio::test]
    async fn test_read_catalog() {
        let exec = RecordingExecutor::new("mysql")
            .respond(
                "information_schema.TABLES",
                vec![
                    Row::new().with("table_schema", "shop").with("table_name", "Order"),
                    Row::new()
                        .with("table_schema", "shop")
                        .with("table_name", "_driftless_history"),
                ],
            )
            .respond(
                "information_schema.COLUMNS",
                vec![
                    col("Order", "Id", "int", "NO", "PRI", "auto_increment"),
                    col("Order", "Total", "decimal(10,2)", "YES", "", ""),
                    col("Order", "Status", "varchar(20)", "NO", "", ""),
                    col("Order", "Notes", "text", "YES", "", ""),
                    col("_driftless_history", "Id", "bigint", "NO", "PRI", "auto_increment"),
                ],
            );

        let tables = MySqlCatalog
            .read_catalog(&exec, &CatalogFilter::new("_driftless_history"))
            .await
            .unwrap();

        assert_eq!(tables.len(), 1);
        let order = &tables[0];
        assert_eq!(order.schema.as_deref(), Some("shop"));
        assert_eq!(order.columns.len(), 4);

        let id = order.find_column("Id").unwrap();
        assert!(id.primary_key && id.identity && !id.nullable);

        let total = order.find_column("Total").unwrap();
        assert_eq!((total.precision, total.scale), (Some(10), Some(2)));

        assert_eq!(order.find_column("Status").unwrap().max_length, Some(20));
        assert_eq!(order.find_column("Notes").unwrap().max_length, None);
    }
}
