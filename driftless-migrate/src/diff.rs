//! Schema differencing.
//!
//! Compares declared entities against live tables and produces the minimal
//! structural difference. The differ is pure: it never touches a database
//! and yields the same result for the same input order.

use driftless_model::{ColumnDefinition, EntityDefinition, PropertyDefinition, TableDefinition};
use tracing::debug;

use crate::compat::TypeOracle;
use crate::policy::MigrationPolicy;

/// Changes needed to one existing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableChange {
    /// Declared side.
    pub entity: EntityDefinition,
    /// Live side.
    pub table: TableDefinition,
    /// Declared properties with no live column.
    pub columns_to_add: Vec<PropertyDefinition>,
    /// Declared properties whose live column is too narrow or nullable.
    pub columns_to_alter: Vec<(PropertyDefinition, ColumnDefinition)>,
    /// Live columns with no declared property.
    pub columns_to_delete: Vec<ColumnDefinition>,
}

impl TableChange {
    /// Check if the change carries no work.
    pub fn is_empty(&self) -> bool {
        self.columns_to_add.is_empty()
            && self.columns_to_alter.is_empty()
            && self.columns_to_delete.is_empty()
    }
}

/// The difference between a declared model and a live database.
///
/// A table appears in at most one of the three buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDifference {
    /// Declared entities with no live table.
    pub tables_to_create: Vec<EntityDefinition>,
    /// Live tables with no declared entity.
    pub tables_to_delete: Vec<TableDefinition>,
    /// Matched tables needing column changes.
    pub table_changes: Vec<TableChange>,
}

impl SchemaDifference {
    /// Check if there are any differences.
    pub fn is_empty(&self) -> bool {
        self.tables_to_create.is_empty()
            && self.tables_to_delete.is_empty()
            && self.table_changes.is_empty()
    }

    /// Whether applying the difference drops tables or columns.
    pub fn is_destructive(&self) -> bool {
        !self.tables_to_delete.is_empty()
            || self
                .table_changes
                .iter()
                .any(|c| !c.columns_to_delete.is_empty())
    }

    /// Get a human-readable summary of the difference.
    pub fn summary(&self) -> String {
        let count = |f: fn(&TableChange) -> usize| -> usize {
            self.table_changes.iter().map(f).sum()
        };

        let mut parts = Vec::new();
        if !self.tables_to_create.is_empty() {
            parts.push(format!("Create {} tables", self.tables_to_create.len()));
        }
        let added = count(|c| c.columns_to_add.len());
        if added > 0 {
            parts.push(format!("Add {} columns", added));
        }
        let altered = count(|c| c.columns_to_alter.len());
        if altered > 0 {
            parts.push(format!("Alter {} columns", altered));
        }
        let dropped = count(|c| c.columns_to_delete.len());
        if dropped > 0 {
            parts.push(format!("Drop {} columns", dropped));
        }
        if !self.tables_to_delete.is_empty() {
            parts.push(format!("Drop {} tables", self.tables_to_delete.len()));
        }

        if parts.is_empty() {
            "No changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Schema differ.
pub struct SchemaDiffer<'a> {
    oracle: &'a dyn TypeOracle,
    allow_drop_column: bool,
    allow_drop_table: bool,
}

impl<'a> SchemaDiffer<'a> {
    /// Create a differ using `oracle` for type decisions.
    pub fn new(oracle: &'a dyn TypeOracle) -> Self {
        Self {
            oracle,
            allow_drop_column: false,
            allow_drop_table: false,
        }
    }

    /// Take the drop permissions from a policy.
    pub fn with_policy(mut self, policy: &MigrationPolicy) -> Self {
        self.allow_drop_column = policy.allow_drop_column;
        self.allow_drop_table = policy.allow_drop_table;
        self
    }

    /// Compute the difference between declared entities and live tables.
    pub fn diff(&self, entities: &[EntityDefinition], tables: &[TableDefinition]) -> SchemaDifference {
        let mut result = SchemaDifference::default();
        let mut matched = vec![false; tables.len()];

        for entity in entities {
            let found = tables
                .iter()
                .enumerate()
                .find(|(i, t)| !matched[*i] && t.matches(&entity.table_name, entity.schema()));

            match found {
                None => {
                    debug!(table = %entity.table_name, "Table missing");
                    result.tables_to_create.push(entity.clone());
                }
                Some((index, table)) => {
                    matched[index] = true;
                    let change = self.diff_table(entity, table);
                    if !change.is_empty() {
                        result.table_changes.push(change);
                    }
                }
            }
        }

        if self.allow_drop_table {
            for (table, _) in tables.iter().zip(&matched).filter(|(_, m)| !**m) {
                debug!(table = %table.name, "Table not declared");
                result.tables_to_delete.push(table.clone());
            }
        }

        result
    }

    fn diff_table(&self, entity: &EntityDefinition, table: &TableDefinition) -> TableChange {
        let mut change = TableChange {
            entity: entity.clone(),
            table: table.clone(),
            columns_to_add: Vec::new(),
            columns_to_alter: Vec::new(),
            columns_to_delete: Vec::new(),
        };

        for property in &entity.properties {
            match table.find_column(&property.name) {
                None => change.columns_to_add.push(property.clone()),
                Some(column) => {
                    if self.oracle.needs_alter(property, column) {
                        debug!(
                            table = %table.name,
                            column = %column.name,
                            actual = %column.data_type,
                            "Column needs alteration"
                        );
                        change
                            .columns_to_alter
                            .push((property.clone(), column.clone()));
                    }
                }
            }
        }

        if self.allow_drop_column {
            change.columns_to_delete = table
                .columns
                .iter()
                .filter(|c| entity.find_property(&c.name).is_none())
                .cloned()
                .collect();
        }

        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compat::oracle_for;
    use driftless_model::{Dialect, ValueKind};
    use pretty_assertions::assert_eq;

    fn customer() -> EntityDefinition {
        EntityDefinition::new("Customer")
            .property(PropertyDefinition::new("Id", ValueKind::Int64).primary_key().identity())
            .property(PropertyDefinition::new("Name", ValueKind::String).max_length(50).required())
    }

    fn customer_table() -> TableDefinition {
        TableDefinition::new("customer")
            .in_schema("public")
            .column(ColumnDefinition::new("id", "bigint").primary_key().identity())
            .column(ColumnDefinition::new("name", "character varying").max_length(50).not_null())
            .column(ColumnDefinition::new("legacy", "text"))
    }

    #[test]
    fn test_synchronized_is_empty() {
        let oracle = oracle_for(Dialect::PostgreSql);
        let diff = SchemaDiffer::new(oracle.as_ref()).diff(&[customer()], &[customer_table()]);
        assert!(diff.is_empty());
        assert_eq!(diff.summary(), "No changes");
    }

    #[test]
    fn test_missing_table_and_column() {
        let oracle = oracle_for(Dialect::PostgreSql);
        let entity = customer()
            .property(PropertyDefinition::new("Email", ValueKind::String).max_length(200));
        let order = EntityDefinition::new("Order")
            .property(PropertyDefinition::new("Id", ValueKind::Int32).primary_key());

        let diff = SchemaDiffer::new(oracle.as_ref()).diff(&[entity, order], &[customer_table()]);

        assert_eq!(diff.tables_to_create.len(), 1);
        assert_eq!(diff.tables_to_create[0].table_name, "Order");
        assert_eq!(diff.table_changes.len(), 1);
        assert_eq!(diff.table_changes[0].columns_to_add[0].name, "Email");
        assert_eq!(diff.summary(), "Create 1 tables, Add 1 columns");
    }

    #[test]
    fn test_widening_only() {
        let oracle = oracle_for(Dialect::PostgreSql);
        let widened = EntityDefinition::new("Customer")
            .property(PropertyDefinition::new("Id", ValueKind::Int64).primary_key())
            .property(PropertyDefinition::new("Name", ValueKind::String).max_length(100).required());
        let narrowed = EntityDefinition::new("Customer")
            .property(PropertyDefinition::new("Id", ValueKind::Int32).primary_key())
            .property(PropertyDefinition::new("Name", ValueKind::String).max_length(20).required());

        let differ = SchemaDiffer::new(oracle.as_ref());
        let diff = differ.diff(&[widened], &[customer_table()]);
        assert_eq!(diff.table_changes[0].columns_to_alter.len(), 1);
        assert_eq!(diff.table_changes[0].columns_to_alter[0].1.name, "name");

        assert!(differ.diff(&[narrowed], &[customer_table()]).is_empty());
    }

    #[test]
    fn test_drops_are_opt_in() {
        let oracle = oracle_for(Dialect::PostgreSql);
        let extra = TableDefinition::new("audit").column(ColumnDefinition::new("id", "integer"));
        let tables = [customer_table(), extra];

        let diff = SchemaDiffer::new(oracle.as_ref()).diff(&[customer()], &tables);
        assert!(diff.is_empty());

        let policy = MigrationPolicy::new()
            .allow_drop_column(true)
            .allow_drop_table(true);
        let diff = SchemaDiffer::new(oracle.as_ref())
            .with_policy(&policy)
            .diff(&[customer()], &tables);

        assert!(diff.is_destructive());
        assert_eq!(diff.tables_to_delete.len(), 1);
        assert_eq!(diff.tables_to_delete[0].name, "audit");
        assert_eq!(diff.table_changes[0].columns_to_delete.len(), 1);
        assert_eq!(diff.table_changes[0].columns_to_delete[0].name, "legacy");
        assert_eq!(diff.summary(), "Drop 1 columns, Drop 1 tables");
    }

    #[test]
    fn test_schema_matching() {
        let oracle = oracle_for(Dialect::PostgreSql);
        let in_sales = customer().in_schema("sales");
        let diff = SchemaDiffer::new(oracle.as_ref()).diff(&[in_sales], &[customer_table()]);
        assert_eq!(diff.tables_to_create.len(), 1);
    }

    #[test]
    fn test_table_in_one_bucket_only() {
        let oracle = oracle_for(Dialect::PostgreSql);
        let policy = MigrationPolicy::new().allow_drop_table(true);
        let a = EntityDefinition::new("Customer").property(PropertyDefinition::new("Id", ValueKind::Int64));
        let b = EntityDefinition::new("Customer")
            .in_schema("archive")
            .property(PropertyDefinition::new("Id", ValueKind::Int64));

        let diff = SchemaDiffer::new(oracle.as_ref())
            .with_policy(&policy)
            .diff(&[a, b], &[customer_table()]);

        assert_eq!(diff.tables_to_create.len(), 1);
        assert!(diff.tables_to_delete.is_empty());
    }
}
