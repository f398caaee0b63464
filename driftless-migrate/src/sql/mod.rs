//! DDL generation.
//!
//! Renders a [`SchemaDifference`] into dialect-specific scripts. Scripts are
//! always emitted in the same order: table creates, then for each changed
//! table its column adds, alters and drops, then table drops. Capabilities
//! are checked before rendering, so an operation a dialect cannot perform
//! fails generation instead of reaching the server.

mod mssql;
mod mysql;
mod postgres;
mod sqlite;

pub use mssql::MssqlGenerator;
pub use mysql::MySqlGenerator;
pub use postgres::PostgresGenerator;
pub use sqlite::SqliteGenerator;

use driftless_model::{ColumnDefinition, Dialect, EntityDefinition, PropertyDefinition, TableDefinition};

use crate::capability::{Capability, ServerVersion, add_primary_key_capability, capability};
use crate::compat::{TypeFamily, TypeOracle, UNBOUNDED, oracle_for};
use crate::diff::SchemaDifference;
use crate::error::MigrateResult;
use crate::policy::MigrationPolicy;
use crate::script::{MigrationScript, Operation};

/// Settings that shape generated DDL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Server version, for capability checks.
    pub version: Option<ServerVersion>,
    /// MySQL storage engine.
    pub mysql_engine: String,
    /// MySQL default character set.
    pub mysql_charset: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self::from_policy(&MigrationPolicy::default(), None)
    }
}

impl GeneratorOptions {
    /// Options from a policy and the detected server version.
    pub fn from_policy(policy: &MigrationPolicy, version: Option<ServerVersion>) -> Self {
        Self {
            version,
            mysql_engine: policy.mysql_engine.clone(),
            mysql_charset: policy.mysql_charset.clone(),
        }
    }

    /// Set the server version.
    pub fn version(mut self, version: ServerVersion) -> Self {
        self.version = Some(version);
        self
    }
}

/// Per-dialect DDL rendering.
pub trait DdlGenerator: Send + Sync {
    /// Target dialect.
    fn dialect(&self) -> Dialect;

    /// Server version used for capability checks.
    fn version(&self) -> Option<ServerVersion>;

    /// Render `CREATE TABLE` for an entity, including its primary key and
    /// identity column.
    fn create_table(&self, entity: &EntityDefinition) -> MigrateResult<MigrationScript>;

    /// Render an added column. `key` holds the table's full primary key when
    /// this column completes a key the live table lacks.
    fn add_column(
        &self,
        entity: &EntityDefinition,
        property: &PropertyDefinition,
        key: Option<&[&PropertyDefinition]>,
    ) -> MigrateResult<MigrationScript>;

    /// Render a widening or tightening alteration.
    fn alter_column(
        &self,
        entity: &EntityDefinition,
        property: &PropertyDefinition,
        column: &ColumnDefinition,
    ) -> MigrateResult<MigrationScript>;

    /// Render a column drop.
    fn drop_column(
        &self,
        table: &TableDefinition,
        column: &ColumnDefinition,
    ) -> MigrateResult<MigrationScript>;

    /// Render a table drop.
    fn drop_table(&self, table: &TableDefinition) -> MigrateResult<MigrationScript>;

    /// Whether the dialect can perform `operation` at the detected version.
    fn capability(&self, operation: Operation) -> Capability {
        capability(self.dialect(), self.version(), operation)
    }

    /// Render a whole difference in dependency order.
    fn generate(&self, diff: &SchemaDifference) -> MigrateResult<Vec<MigrationScript>> {
        let dialect = self.dialect();
        let require = |op: Operation| self.capability(op).require(op.as_str(), dialect);
        let mut scripts = Vec::new();

        for entity in &diff.tables_to_create {
            scripts.push(self.create_table(entity)?);
        }

        for change in &diff.table_changes {
            let entity_key = change.entity.primary_key();
            let completes_key = (!change.table.has_primary_key())
                .then(|| change.columns_to_add.iter().rposition(|p| p.primary_key))
                .flatten();

            for (index, property) in change.columns_to_add.iter().enumerate() {
                let key = if completes_key == Some(index) {
                    add_primary_key_capability(dialect)
                        .require(Operation::AddColumn.as_str(), dialect)?;
                    Some(entity_key.as_slice())
                } else {
                    None
                };
                scripts.push(self.add_column(&change.entity, property, key)?);
            }

            if !change.columns_to_alter.is_empty() {
                require(Operation::AlterColumn)?;
            }
            for (property, column) in &change.columns_to_alter {
                scripts.push(self.alter_column(&change.entity, property, column)?);
            }

            if !change.columns_to_delete.is_empty() {
                require(Operation::DropColumn)?;
            }
            for column in &change.columns_to_delete {
                scripts.push(self.drop_column(&change.table, column)?);
            }
        }

        if !diff.tables_to_delete.is_empty() {
            require(Operation::DropTable)?;
        }
        for table in &diff.tables_to_delete {
            scripts.push(self.drop_table(table)?);
        }

        Ok(scripts)
    }
}

/// The generator for a dialect.
pub fn generator_for(dialect: Dialect, options: GeneratorOptions) -> Box<dyn DdlGenerator> {
    match dialect {
        Dialect::Sqlite => Box::new(SqliteGenerator::new(options)),
        Dialect::MySql => Box::new(MySqlGenerator::new(options)),
        Dialect::PostgreSql => Box::new(PostgresGenerator::new(options)),
        Dialect::SqlServer => Box::new(MssqlGenerator::new(options)),
    }
}

/// `schema.table` for descriptions.
pub(crate) fn display_name(schema: Option<&str>, name: &str) -> String {
    match schema.filter(|s| !s.is_empty()) {
        Some(schema) => format!("{}.{}", schema, name),
        None => name.to_string(),
    }
}

/// Comma-separated quoted key columns.
pub(crate) fn key_list(dialect: Dialect, key: &[&PropertyDefinition]) -> String {
    key.iter()
        .map(|p| dialect.quote(&p.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `DEFAULT ...` clause for a property. With `backfill`, a required column
/// without an explicit default gets its kind's zero literal so existing rows
/// satisfy `NOT NULL`.
pub(crate) fn default_clause(
    dialect: Dialect,
    property: &PropertyDefinition,
    backfill: bool,
) -> Option<String> {
    if let Some(expr) = property.default_value.as_deref() {
        return Some(format!("DEFAULT {}", expr));
    }
    if backfill && !property.is_nullable() && !property.identity {
        return property
            .kind
            .zero_literal(dialect)
            .map(|literal| format!("DEFAULT {}", literal));
    }
    None
}

/// What an altered column becomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AlterTarget {
    /// Column type after the alteration.
    pub type_sql: String,
    /// Whether the type differs from the live one.
    pub type_changed: bool,
    /// Whether the column ends up NOT NULL.
    pub not_null: bool,
    /// Whether the alteration tightens nullability.
    pub tightens: bool,
}

/// Compute the target of an alteration without narrowing anything: a
/// compatible type is kept as it is, NOT NULL is never dropped, and decimals
/// keep the larger of the declared and live precision and scale.
pub(crate) fn alter_target(
    dialect: Dialect,
    property: &PropertyDefinition,
    column: &ColumnDefinition,
) -> AlterTarget {
    let oracle = oracle_for(dialect);
    let live = oracle.classify_column(column);
    let type_changed = !oracle.is_compatible(property, column);

    let declared = oracle.classify_property(property);

    let type_sql = if !type_changed {
        live_type_sql(oracle.as_ref(), column)
    } else if declared.family == TypeFamily::Decimal && live.family == TypeFamily::Decimal {
        let precision = declared.precision.max(live.precision);
        let scale = declared.scale.max(live.scale);
        property
            .kind
            .sql_type(dialect, property.max_length, precision, scale)
    } else {
        property.resolve_sql_type(dialect)
    };

    let tightens = !property.is_nullable() && column.nullable;
    AlterTarget {
        type_sql,
        type_changed,
        not_null: tightens || !column.nullable,
        tightens,
    }
}

/// Re-render a live column's full type, restoring size arguments the
/// catalog reports separately.
pub(crate) fn live_type_sql(oracle: &dyn TypeOracle, column: &ColumnDefinition) -> String {
    if column.data_type.contains('(') {
        return column.data_type.clone();
    }

    let ty = oracle.classify_column(column);
    match ty.family {
        TypeFamily::String | TypeFamily::Binary => match column.max_length {
            Some(n) if n != UNBOUNDED => format!("{}({})", column.data_type, n),
            _ => column.data_type.clone(),
        },
        TypeFamily::Decimal => match (column.precision, column.scale) {
            (Some(p), Some(s)) => format!("{}({},{})", column.data_type, p, s),
            (Some(p), None) => format!("{}({})", column.data_type, p),
            _ => column.data_type.clone(),
        },
        _ => column.data_type.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::TableChange;
    use crate::error::MigrationError;
    use driftless_model::ValueKind;

    fn change(entity: EntityDefinition, table: TableDefinition) -> TableChange {
        TableChange {
            entity,
            table,
            columns_to_add: Vec::new(),
            columns_to_alter: Vec::new(),
            columns_to_delete: Vec::new(),
        }
    }

    #[test]
    fn test_default_clause() {
        let required = PropertyDefinition::new("Qty", ValueKind::Int32).required();
        assert_eq!(
            default_clause(Dialect::PostgreSql, &required, true).as_deref(),
            Some("DEFAULT 0")
        );
        assert_eq!(default_clause(Dialect::PostgreSql, &required, false), None);
        assert_eq!(default_clause(Dialect::MySql, &required, true), None);

        let explicit = required.clone().default_value("1");
        assert_eq!(
            default_clause(Dialect::MySql, &explicit, false).as_deref(),
            Some("DEFAULT 1")
        );

        let optional = PropertyDefinition::new("Qty", ValueKind::Int32);
        assert_eq!(default_clause(Dialect::Sqlite, &optional, true), None);
    }

    #[test]
    fn test_alter_target_keeps_compatible_type() {
        let property = PropertyDefinition::new("Status", ValueKind::String)
            .max_length(20)
            .required();
        let column = ColumnDefinition::new("Status", "character varying").max_length(50);

        let target = alter_target(Dialect::PostgreSql, &property, &column);
        assert_eq!(target.type_sql, "character varying(50)");
        assert!(!target.type_changed);
        assert!(target.tightens && target.not_null);
    }

    #[test]
    fn test_alter_target_never_loosens() {
        let property = PropertyDefinition::new("Status", ValueKind::String).max_length(100);
        let column = ColumnDefinition::new("Status", "nvarchar").max_length(50).not_null();

        let target = alter_target(Dialect::SqlServer, &property, &column);
        assert_eq!(target.type_sql, "NVARCHAR(100)");
        assert!(target.type_changed);
        assert!(target.not_null);
        assert!(!target.tightens);
    }

    #[test]
    fn test_alter_target_decimal_max() {
        let property = PropertyDefinition::new("Total", ValueKind::Decimal).precision(12, 2);
        let column = ColumnDefinition::new("Total", "decimal").precision(10, 4);

        let target = alter_target(Dialect::MySql, &property, &column);
        assert_eq!(target.type_sql, "DECIMAL(12,4)");
    }

    #[test]
    fn test_generate_order() {
        let generator = generator_for(Dialect::PostgreSql, GeneratorOptions::default());
        let entity = EntityDefinition::new("Customer")
            .property(PropertyDefinition::new("Id", ValueKind::Int64).primary_key())
            .property(PropertyDefinition::new("Email", ValueKind::String).max_length(100))
            .property(PropertyDefinition::new("Name", ValueKind::String).max_length(100));
        let table = TableDefinition::new("Customer")
            .column(ColumnDefinition::new("Id", "bigint").primary_key())
            .column(ColumnDefinition::new("Name", "character varying").max_length(50))
            .column(ColumnDefinition::new("Legacy", "text"));

        let mut c = change(entity.clone(), table.clone());
        c.columns_to_add.push(entity.properties[1].clone());
        c.columns_to_alter
            .push((entity.properties[2].clone(), table.columns[1].clone()));
        c.columns_to_delete.push(table.columns[2].clone());

        let diff = SchemaDifference {
            tables_to_create: vec![
                EntityDefinition::new("Order")
                    .property(PropertyDefinition::new("Id", ValueKind::Int32).primary_key()),
            ],
            tables_to_delete: vec![TableDefinition::new("Audit")],
            table_changes: vec![c],
        };

        let ops: Vec<Operation> = generator
            .generate(&diff)
            .unwrap()
            .iter()
            .map(|s| s.operation)
            .collect();
        assert_eq!(
            ops,
            vec![
                Operation::CreateTable,
                Operation::AddColumn,
                Operation::AlterColumn,
                Operation::DropColumn,
                Operation::DropTable,
            ]
        );
    }

    #[test]
    fn test_capability_checked_before_rendering() {
        let old = GeneratorOptions::default().version(ServerVersion::new(3, 31, 0));
        let generator = generator_for(Dialect::Sqlite, old);
        let table = TableDefinition::new("t")
            .column(ColumnDefinition::new("id", "INTEGER").primary_key())
            .column(ColumnDefinition::new("gone", "TEXT"));
        let mut c = change(
            EntityDefinition::new("t")
                .property(PropertyDefinition::new("id", ValueKind::Int64).primary_key()),
            table.clone(),
        );
        c.columns_to_delete.push(table.columns[1].clone());

        let diff = SchemaDifference {
            table_changes: vec![c],
            ..Default::default()
        };
        let err = generator.generate(&diff).unwrap_err();
        assert!(matches!(err, MigrationError::Unsupported { .. }));
        assert!(err.to_string().contains("3.35.0"));
    }
}
