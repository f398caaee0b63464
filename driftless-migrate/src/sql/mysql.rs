//! MySQL DDL.

use driftless_model::{ColumnDefinition, Dialect, EntityDefinition, PropertyDefinition, TableDefinition};

use super::{DdlGenerator, GeneratorOptions, alter_target, default_clause, display_name, key_list};
use crate::capability::ServerVersion;
use crate::error::MigrateResult;
use crate::script::{MigrationScript, Operation};

const DIALECT: Dialect = Dialect::MySql;

/// MySQL DDL generator.
#[derive(Debug, Clone)]
pub struct MySqlGenerator {
    options: GeneratorOptions,
}

impl MySqlGenerator {
    /// Create a new generator.
    pub fn new(options: GeneratorOptions) -> Self {
        Self { options }
    }

    fn table_options(&self) -> String {
        format!(
            "ENGINE={} DEFAULT CHARSET={}",
            self.options.mysql_engine, self.options.mysql_charset
        )
    }

    /// `AUTO_INCREMENT` is only valid on a key column.
    fn column_definition(&self, property: &PropertyDefinition, keyed: bool) -> String {
        let mut parts = vec![
            DIALECT.quote(&property.name),
            property.resolve_sql_type(DIALECT),
        ];

        parts.push(if property.is_nullable() { "NULL" } else { "NOT NULL" }.to_string());

        if property.identity && keyed {
            parts.push("AUTO_INCREMENT".to_string());
        } else if let Some(default) = default_clause(DIALECT, property, false) {
            parts.push(default);
        }

        parts.join(" ")
    }
}

impl DdlGenerator for MySqlGenerator {
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
            .map(|p| self.column_definition(p, p.primary_key))
            .collect();

        if !key.is_empty() {
            columns.push(format!("PRIMARY KEY ({})", key_list(DIALECT, &key)));
        }

        let sql = format!(
            "CREATE TABLE {} (\n    {}\n) {}",
            DIALECT.qualify(entity.schema(), &entity.table_name),
            columns.join(",\n    "),
            self.table_options()
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
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {}",
            DIALECT.qualify(entity.schema(), &entity.table_name),
            self.column_definition(property, key.is_some())
        );
        if let Some(key) = key {
            sql.push_str(&format!(", ADD PRIMARY KEY ({})", key_list(DIALECT, key)));
        }

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
        entity: &EntityDefinition,
        property: &PropertyDefinition,
        column: &ColumnDefinition,
    ) -> MigrateResult<MigrationScript> {
        let target = alter_target(DIALECT, property, column);

        // MODIFY restates the whole column; keep the live auto-increment.
        let mut definition = vec![
            DIALECT.quote(&column.name),
            target.type_sql.clone(),
            if target.not_null { "NOT NULL" } else { "NULL" }.to_string(),
        ];
        if column.identity {
            definition.push("AUTO_INCREMENT".to_string());
        } else if let Some(default) = default_clause(DIALECT, property, false) {
            definition.push(default);
        }

        let sql = format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            DIALECT.qualify(entity.schema(), &entity.table_name),
            definition.join(" ")
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

    fn generator() -> MySqlGenerator {
        MySqlGenerator::new(GeneratorOptions::default())
    }

    #[test]
    fn test_create_table() {
        let entity = EntityDefinition::new("Order")
            .in_schema("shop")
            .property(PropertyDefinition::new("Id", ValueKind::Int32).primary_key().identity())
            .property(PropertyDefinition::new("Total", ValueKind::Decimal).precision(10, 2))
            .property(PropertyDefinition::new("Status", ValueKind::String).max_length(20).required());

        let script = generator().create_table(&entity).unwrap();
        assert_eq!(
            script.sql,
            "CREATE TABLE `shop`.`Order` (\n    `Id` INT NOT NULL AUTO_INCREMENT,\n    `Total` DECIMAL(10,2) NULL,\n    `Status` VARCHAR(20) NOT NULL,\n    PRIMARY KEY (`Id`)\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
        );
        assert_eq!(script.description, "Create table shop.Order");
    }

    #[test]
    fn test_table_options_from_policy() {
        let options = GeneratorOptions {
            mysql_engine: "Aria".into(),
            mysql_charset: "latin1".into(),
            ..Default::default()
        };
        let entity = EntityDefinition::new("t").property(PropertyDefinition::new("x", ValueKind::Int32));
        let script = MySqlGenerator::new(options).create_table(&entity).unwrap();
        assert!(script.sql.ends_with(") ENGINE=Aria DEFAULT CHARSET=latin1"));
    }

    #[test]
    fn test_add_key_column() {
        let entity = EntityDefinition::new("Log");
        let id = PropertyDefinition::new("Id", ValueKind::Int64).primary_key().identity();
        let script = generator().add_column(&entity, &id, Some(&[&id])).unwrap();
        assert_eq!(
            script.sql,
            "ALTER TABLE `Log` ADD COLUMN `Id` BIGINT NOT NULL AUTO_INCREMENT, ADD PRIMARY KEY (`Id`)"
        );
    }

    #[test]
    fn test_alter_column_keeps_identity() {
        let entity = EntityDefinition::new("Order");
        let id = PropertyDefinition::new("Id", ValueKind::Int64).primary_key().identity();
        let column = ColumnDefinition::new("Id", "int").primary_key().identity();

        let script = generator().alter_column(&entity, &id, &column).unwrap();
        assert_eq!(
            script.sql,
            "ALTER TABLE `Order` MODIFY COLUMN `Id` BIGINT NOT NULL AUTO_INCREMENT"
        );
        assert_eq!(script.description, "Alter column Order.Id (int -> BIGINT)");
    }

    #[test]
    fn test_quote_escaping() {
        let table = TableDefinition::new("we`ird");
        let script = generator().drop_table(&table).unwrap();
        assert_eq!(script.sql, "DROP TABLE `we``ird`");
    }
}
