//! SQL Server DDL.

use driftless_model::{ColumnDefinition, Dialect, EntityDefinition, PropertyDefinition, TableDefinition};

use super::{DdlGenerator, GeneratorOptions, alter_target, default_clause, display_name, key_list};
use crate::capability::ServerVersion;
use crate::error::MigrateResult;
use crate::script::{MigrationScript, Operation};

const DIALECT: Dialect = Dialect::SqlServer;

/// SQL Server DDL generator.
#[derive(Debug, Clone)]
pub struct MssqlGenerator {
    options: GeneratorOptions,
}

impl MssqlGenerator {
    /// Create a new generator.
    pub fn new(options: GeneratorOptions) -> Self {
        Self { options }
    }

    fn column_definition(&self, property: &PropertyDefinition, backfill: bool) -> String {
        let mut parts = vec![
            DIALECT.quote(&property.name),
            property.resolve_sql_type(DIALECT),
        ];

        if property.identity {
            parts.push("IDENTITY(1,1)".to_string());
        }
        parts.push(if property.is_nullable() { "NULL" } else { "NOT NULL" }.to_string());

        if let Some(default) = default_clause(DIALECT, property, backfill) {
            parts.push(default);
        }

        parts.join(" ")
    }

    fn pk_constraint(&self, table: &str) -> String {
        DIALECT.quote(&format!("PK_{}", table))
    }

    /// Schema-qualified name as a string literal, for catalog lookups.
    fn object_literal(schema: Option<&str>, table: &str) -> String {
        DIALECT.string_literal(&DIALECT.qualify(schema, table))
    }
}

impl DdlGenerator for MssqlGenerator {
    fn dialect(&self) -> Dialect {
        DIALECT
    }

    fn version(&self) -> Option<ServerVersion> {
        self.options.version
    }

    fn create_table(&self, entity: &EntityDefinition) -> MigrateResult<MigrationScript> {
        let key = entity.primary_key();
        let mut columns: Vec<String> = entity
            .properties
            .iter()
            .map(|p| self.column_definition(p, false))
            .collect();

        if !key.is_empty() {
            columns.push(format!(
                "CONSTRAINT {} PRIMARY KEY ({})",
                self.pk_constraint(&entity.table_name),
                key_list(DIALECT, &key)
            ));
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
        let table = DIALECT.qualify(entity.schema(), &entity.table_name);
        let mut statements = vec![format!(
            "ALTER TABLE {} ADD {}",
            table,
            self.column_definition(property, true)
        )];
        if let Some(key) = key {
            statements.push(format!(
                "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
                table,
                self.pk_constraint(&entity.table_name),
                key_list(DIALECT, key)
            ));
        }

        Ok(MigrationScript::from_statements(
            &entity.table_name,
            Operation::AddColumn,
            statements,
            format!(
                "Add column {}.{}",
                display_name(entity.schema(), &entity.table_name),
                property.name
            ),
        ))
    }

    fn alter_column(
        &self,
        entity: &EntityDefinition,
        property: &PropertyDefinition,
        column: &ColumnDefinition,
    ) -> MigrateResult<MigrationScript> {
        let target = alter_target(DIALECT, property, column);

        let sql = format!(
            "ALTER TABLE {} ALTER COLUMN {} {} {}",
            DIALECT.qualify(entity.schema(), &entity.table_name),
            DIALECT.quote(&column.name),
            target.type_sql,
            if target.not_null { "NOT NULL" } else { "NULL" }
        );

        Ok(MigrationScript::new(
            &entity.table_name,
            Operation::AlterColumn,
            sql,
            format!(
                "Alter column {}.{} ({} -> {}{})",
                display_name(entity.schema(), &entity.table_name),
                column.name,
                column.data_type,
                target.type_sql,
                if target.tightens { ", NOT NULL" } else { "" }
            ),
        ))
    }

    /// A column with a default constraint cannot be dropped until the
    /// constraint is, and its name is generated by the server.
    fn drop_column(
        &self,
        table: &TableDefinition,
        column: &ColumnDefinition,
    ) -> MigrateResult<MigrationScript> {
        let qualified = DIALECT.qualify(table.schema(), &table.name);
        let drop_default = format!(
            "DECLARE @df sysname;\n\
             SELECT @df = dc.name FROM sys.default_constraints dc \
             JOIN sys.columns c ON c.default_object_id = dc.object_id \
             WHERE dc.parent_object_id = OBJECT_ID({}) AND c.name = {};\n\
             IF @df IS NOT NULL EXEC(N'ALTER TABLE {} DROP CONSTRAINT [' + @df + N']')",
            Self::object_literal(table.schema(), &table.name),
            DIALECT.string_literal(&column.name),
            qualified.replace('\'', "''")
        );
        let drop = format!(
            "ALTER TABLE {} DROP COLUMN {}",
            qualified,
            DIALECT.quote(&column.name)
        );

        Ok(MigrationScript::from_statements(
            &table.name,
            Operation::DropColumn,
            vec![drop_default, drop],
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
