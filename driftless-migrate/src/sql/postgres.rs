//! PostgreSQL DDL.
//!
//! Identity columns are backed by an owned sequence: the sequence is
//! created first, the column defaults to `nextval`, and the sequence is then
//! marked `OWNED BY` the column so dropping either cleans up the other.

use driftless_model::{ColumnDefinition, Dialect, EntityDefinition, PropertyDefinition, TableDefinition};

use super::{DdlGenerator, GeneratorOptions, alter_target, default_clause, display_name, key_list};
use crate::capability::ServerVersion;
use crate::error::MigrateResult;
use crate::script::{MigrationScript, Operation};

const DIALECT: Dialect = Dialect::PostgreSql;

/// PostgreSQL DDL generator.
#[derive(Debug, Clone)]
pub struct PostgresGenerator {
    options: GeneratorOptions,
}

/// Statements bracketing a column that owns a sequence.
struct Sequence {
    create: String,
    default: String,
    own: String,
}

impl PostgresGenerator {
    /// Create a new generator.
    pub fn new(options: GeneratorOptions) -> Self {
        Self { options }
    }

    fn sequence(&self, schema: Option<&str>, table: &str, column: &str) -> Sequence {
        let name = DIALECT.qualify(schema, &format!("{}_{}_seq", table, column));
        Sequence {
            create: format!("CREATE SEQUENCE IF NOT EXISTS {}", name),
            default: format!("DEFAULT nextval({})", DIALECT.string_literal(&name)),
            own: format!(
                "ALTER SEQUENCE {} OWNED BY {}.{}",
                name,
                DIALECT.qualify(schema, table),
                DIALECT.quote(column)
            ),
        }
    }

    fn column_definition(
        &self,
        property: &PropertyDefinition,
        sequence: Option<&Sequence>,
        backfill: bool,
    ) -> String {
        let mut parts = vec![
            DIALECT.quote(&property.name),
            property.resolve_sql_type(DIALECT),
        ];

        if !property.is_nullable() {
            parts.push("NOT NULL".to_string());
        }

        match sequence {
            Some(sequence) => parts.push(sequence.default.clone()),
            None => {
                if let Some(default) = default_clause(DIALECT, property, backfill) {
                    parts.push(default);
                }
            }
        }

        parts.join(" ")
    }

    fn pk_constraint(&self, table: &str) -> String {
        DIALECT.quote(&format!("pk_{}", table))
    }
}

impl DdlGenerator for PostgresGenerator {
    fn dialect(&self) -> Dialect {
        DIALECT
    }

    fn version(&self) -> Option<ServerVersion> {
        self.options.version
    }

    fn create_table(&self, entity: &EntityDefinition) -> MigrateResult<MigrationScript> {
        let schema = entity.schema();
        let table = DIALECT.qualify(schema, &entity.table_name);
        let key = entity.primary_key();

        let mut before = Vec::new();
        let mut after = Vec::new();
        let mut columns = Vec::new();

        for property in &entity.properties {
            if property.identity {
                let sequence = self.sequence(schema, &entity.table_name, &property.name);
                columns.push(self.column_definition(property, Some(&sequence), false));
                before.push(sequence.create);
                after.push(sequence.own);
            } else {
                columns.push(self.column_definition(property, None, false));
            }
        }

        if !key.is_empty() {
            columns.push(format!(
                "CONSTRAINT {} PRIMARY KEY ({})",
                self.pk_constraint(&entity.table_name),
                key_list(DIALECT, &key)
            ));
        }

        let mut statements = before;
        statements.push(format!(
            "CREATE TABLE {} (\n    {}\n)",
            table,
            columns.join(",\n    ")
        ));
        statements.extend(after);

        Ok(MigrationScript::from_statements(
            &entity.table_name,
            Operation::CreateTable,
            statements,
            format!("Create table {}", display_name(schema, &entity.table_name)),
        ))
    }

    fn add_column(
        &self,
        entity: &EntityDefinition,
        property: &PropertyDefinition,
        key: Option<&[&PropertyDefinition]>,
    ) -> MigrateResult<MigrationScript> {
        let schema = entity.schema();
        let table = DIALECT.qualify(schema, &entity.table_name);
        let sequence = property
            .identity
            .then(|| self.sequence(schema, &entity.table_name, &property.name));

        let mut statements = Vec::new();
        if let Some(sequence) = &sequence {
            statements.push(sequence.create.clone());
        }
        statements.push(format!(
            "ALTER TABLE {} ADD COLUMN {}",
            table,
            self.column_definition(property, sequence.as_ref(), true)
        ));
        if let Some(sequence) = sequence {
            statements.push(sequence.own);
        }
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
                display_name(schema, &entity.table_name),
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
        let quoted = DIALECT.quote(&column.name);

        let mut actions = Vec::new();
        if target.type_changed {
            actions.push(format!(
                "ALTER COLUMN {} TYPE {} USING {}::{}",
                quoted, target.type_sql, quoted, target.type_sql
            ));
        }
        if target.tightens {
            actions.push(format!("ALTER COLUMN {} SET NOT NULL", quoted));
        }

        let sql = format!(
            "ALTER TABLE {} {}",
            DIALECT.qualify(entity.schema(), &entity.table_name),
            actions.join(", ")
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

    fn drop_column(
        &self,
        table: &TableDefinition,
        column: &ColumnDefinition,
    ) -> MigrateResult<MigrationScript> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use driftless_model::ValueKind;
    use pretty_assertions::assert_eq;

    fn generator() -> PostgresGenerator {
        PostgresGenerator::new(GeneratorOptions::default())
    }

    fn order() -> EntityDefinition {
        EntityDefinition::new("Order")
            .property(PropertyDefinition::new("Id", ValueKind::Int32).primary_key().identity())
            .property(PropertyDefinition::new("Total", ValueKind::Decimal).precision(10, 2))
            .property(PropertyDefinition::new("Status", ValueKind::String).max_length(20).required())
    }

    #[test]
    fn test_create_table_with_sequence() {
        let script = generator().create_table(&order()).unwrap();
        assert_eq!(
            script.statements(),
            &[
                "CREATE SEQUENCE IF NOT EXISTS \"Order_Id_seq\"".to_string(),
                "CREATE TABLE \"Order\" (\n    \"Id\" INTEGER NOT NULL DEFAULT nextval('\"Order_Id_seq\"'),\n    \"Total\" NUMERIC(10,2),\n    \"Status\" VARCHAR(20) NOT NULL,\n    CONSTRAINT \"pk_Order\" PRIMARY KEY (\"Id\")\n)".to_string(),
                "ALTER SEQUENCE \"Order_Id_seq\" OWNED BY \"Order\".\"Id\"".to_string(),
            ]
        );
    }

    #[test]
    fn test_schema_qualified_sequence() {
        let entity = order().in_schema("sales");
        let script = generator().create_table(&entity).unwrap();
        assert_eq!(
            script.statements()[0],
            "CREATE SEQUENCE IF NOT EXISTS \"sales\".\"Order_Id_seq\""
        );
        assert_eq!(script.description, "Create table sales.Order");
    }

    #[test]
    fn test_add_key_column() {
        let entity = EntityDefinition::new("Log");
        let id = PropertyDefinition::new("Id", ValueKind::Int64).primary_key();
        let script = generator().add_column(&entity, &id, Some(&[&id])).unwrap();
        assert_eq!(
            script.statements(),
            &[
                "ALTER TABLE \"Log\" ADD COLUMN \"Id\" BIGINT NOT NULL DEFAULT 0".to_string(),
                "ALTER TABLE \"Log\" ADD CONSTRAINT \"pk_Log\" PRIMARY KEY (\"Id\")".to_string(),
            ]
        );
    }

    #[test]
    fn test_alter_widen_and_tighten() {
        let property = PropertyDefinition::new("Status", ValueKind::String)
            .max_length(100)
            .required();
        let column = ColumnDefinition::new("Status", "character varying").max_length(20);

        let script = generator().alter_column(&order(), &property, &column).unwrap();
        assert_eq!(
            script.sql,
            "ALTER TABLE \"Order\" ALTER COLUMN \"Status\" TYPE VARCHAR(100) USING \"Status\"::VARCHAR(100), ALTER COLUMN \"Status\" SET NOT NULL"
        );
        assert_eq!(
            script.description,
            "Alter column Order.Status (character varying -> VARCHAR(100), NOT NULL)"
        );
    }

    #[test]
    fn test_tighten_only() {
        let property = PropertyDefinition::new("Status", ValueKind::String)
            .max_length(20)
            .required();
        let column = ColumnDefinition::new("Status", "character varying").max_length(50);

        let script = generator().alter_column(&order(), &property, &column).unwrap();
        assert_eq!(
            script.sql,
            "ALTER TABLE \"Order\" ALTER COLUMN \"Status\" SET NOT NULL"
        );
    }
}
