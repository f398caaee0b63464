//! SQLite DDL.

use driftless_model::{ColumnDefinition, Dialect, EntityDefinition, PropertyDefinition, TableDefinition};

use super::{DdlGenerator, GeneratorOptions, default_clause, display_name, key_list};
use crate::capability::ServerVersion;
use crate::error::{MigrateResult, MigrationError};
use crate::script::{MigrationScript, Operation};

const DIALECT: Dialect = Dialect::Sqlite;

/// SQLite DDL generator.
///
/// A single integer primary key is rendered inline so it aliases the rowid;
/// with identity it also gets `AUTOINCREMENT`.
#[derive(Debug, Clone)]
pub struct SqliteGenerator {
    options: GeneratorOptions,
}

impl SqliteGenerator {
    /// Create a new generator.
    pub fn new(options: GeneratorOptions) -> Self {
        Self { options }
    }

    fn column_definition(
        &self,
        property: &PropertyDefinition,
        inline_key: bool,
        backfill: bool,
    ) -> String {
        let sql_type = property.resolve_sql_type(DIALECT);
        let mut parts = vec![DIALECT.quote(&property.name), sql_type.clone()];

        if inline_key {
            if sql_type == "INTEGER" {
                parts.push("PRIMARY KEY".to_string());
                if property.identity {
                    parts.push("AUTOINCREMENT".to_string());
                }
            } else {
                parts.push("NOT NULL PRIMARY KEY".to_string());
            }
        } else if !property.is_nullable() {
            parts.push("NOT NULL".to_string());
        }

        if let Some(default) = default_clause(DIALECT, property, backfill) {
            parts.push(default);
        }

        parts.join(" ")
    }
}

impl DdlGenerator for SqliteGenerator {
    fn dialect(&self) -> Dialect {
        DIALECT
    }

    fn version(&self) -> Option<ServerVersion> {
        self.options.version
    }

    fn create_table(&self, entity: &EntityDefinition) -> MigrateResult<MigrationScript> {
        let key = entity.primary_key();
        let inline = key.len() == 1;

        let mut columns: Vec<String> = entity
            .properties
            .iter()
            .map(|p| self.column_definition(p, inline && p.primary_key, false))
            .collect();

        if key.len() > 1 {
            columns.push(format!("PRIMARY KEY ({})", key_list(DIALECT, &key)));
        }

        let sql = format!(
            "CREATE TABLE {} (\n    {}\n)",
            DIALECT.qualify(entity.schema(), &entity.table_name),
            columns.join(",\n    ")
        );

        Ok(MigrationScript::new(
            &entity.table_name,
            Operation::CreateTable,
            sql,
            format!(
                "Create table {}",
                display_name(entity.schema(), &entity.table_name)
            ),
        ))
    }

    fn add_column(
        &self,
        entity: &EntityDefinition,
        property: &PropertyDefinition,
        key: Option<&[&PropertyDefinition]>,
    ) -> MigrateResult<MigrationScript> {
        if key.is_some() {
            return Err(MigrationError::unsupported(
                Operation::AddColumn.as_str(),
                DIALECT,
                "SQLite cannot add a PRIMARY KEY column to an existing table; \
                 the table must be rebuilt manually",
            ));
        }

        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {}",
            DIALECT.qualify(entity.schema(), &entity.table_name),
            self.column_definition(property, false, true)
        );

        Ok(MigrationScript::new(
            &entity.table_name,
            Operation::AddColumn,
            sql,
            format!(
                "Add column {}.{}",
                display_name(entity.schema(), &entity.table_name),
                property.name
            ),
        ))
    }

    fn alter_column(
        &self,
        _entity: &EntityDefinition,
        _property: &PropertyDefinition,
        _column: &ColumnDefinition,
    ) -> MigrateResult<MigrationScript> {
        self.capability(Operation::AlterColumn)
            .require(Operation::AlterColumn.as_str(), DIALECT)?;

        // In-place changes are never rendered; a rebuild is left to the caller.
        Err(MigrationError::unsupported(
            Operation::AlterColumn.as_str(),
            DIALECT,
            "column rebuilds are not generated",
        ))
    }

    fn drop_column(
        &self,
        table: &TableDefinition,
        column: &ColumnDefinition,
    ) -> MigrateResult<MigrationScript> {
        self.capability(Operation::DropColumn)
            .require(Operation::DropColumn.as_str(), DIALECT)?;

        let sql = format!(
            "ALTER TABLE {} DROP COLUMN {}",
            DIALECT.qualify(table.schema(), &table.name),
            DIALECT.quote(&column.name)
        );

        Ok(MigrationScript::new(
            &table.name,
            Operation::DropColumn,
            sql,
            format!(
                "Drop column {}.{}",
                display_name(table.schema(), &table.name),
                column.name
            ),
        ))
    }

    fn drop_table(&self, table: &TableDefinition) -> MigrateResult<MigrationScript> {
        Ok(MigrationScript::new(
            &table.name,
            Operation::DropTable,
            format!("DROP TABLE {}", DIALECT.qualify(table.schema(), &table.name)),
            format!("Drop table {}", display_name(table.schema(), &table.name)),
        ))
    }
}
