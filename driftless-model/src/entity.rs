//! Declared entities, as produced by a model introspector.

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::ident::same_ident;
use crate::types::ValueKind;

/// A declared column of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    /// Column name.
    pub name: String,
    /// Logical value type.
    pub kind: ValueKind,
    /// Whether a value is required (NOT NULL).
    pub required: bool,
    /// Whether the column is part of the primary key.
    pub primary_key: bool,
    /// Whether the database generates values (auto-increment).
    pub identity: bool,
    /// Maximum length for string and binary kinds.
    pub max_length: Option<u64>,
    /// Numeric precision for decimals.
    pub precision: Option<u32>,
    /// Numeric scale for decimals.
    pub scale: Option<u32>,
    /// Raw SQL default expression.
    pub default_value: Option<String>,
}

impl PropertyDefinition {
    /// Create a new optional property.
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            primary_key: false,
            identity: false,
            max_length: None,
            precision: None,
            scale: None,
            default_value: None,
        }
    }

    /// Mark the property as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the property as (part of) the primary key. Implies required.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.required = true;
        self
    }

    /// Mark the property as database-generated.
    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    /// Set the maximum length.
    pub fn max_length(mut self, length: u64) -> Self {
        self.max_length = Some(length);
        self
    }

    /// Set numeric precision and scale.
    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Set a raw SQL default expression.
    pub fn default_value(mut self, expr: impl Into<String>) -> Self {
        self.default_value = Some(expr.into());
        self
    }

    /// Whether the column accepts NULL.
    pub fn is_nullable(&self) -> bool {
        !self.required && !self.primary_key
    }

    /// Resolve the column type string for a dialect.
    pub fn resolve_sql_type(&self, dialect: Dialect) -> String {
        self.kind
            .sql_type(dialect, self.max_length, self.precision, self.scale)
    }
}

/// A declared table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDefinition {
    /// Table name.
    pub table_name: String,
    /// Optional schema; `None` matches a table in any schema.
    pub schema: Option<String>,
    /// Declared columns, in declaration order.
    pub properties: Vec<PropertyDefinition>,
}

impl EntityDefinition {
    /// Create a new entity with no properties.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            schema: None,
            properties: Vec::new(),
        }
    }

    /// Place the entity in a schema.
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Append a property.
    pub fn property(mut self, property: PropertyDefinition) -> Self {
        self.properties.push(property);
        self
    }

    /// Schema, ignoring empty strings.
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref().filter(|s| !s.is_empty())
    }

    /// Find a property by case-insensitive name.
    pub fn find_property(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|p| same_ident(&p.name, name))
    }

    /// Primary key properties, in declaration order.
    pub fn primary_key(&self) -> Vec<&PropertyDefinition> {
        self.properties.iter().filter(|p| p.primary_key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> EntityDefinition {
        EntityDefinition::new("Order")
            .property(
                PropertyDefinition::new("Id", ValueKind::Int32)
                    .primary_key()
                    .identity(),
            )
            .property(PropertyDefinition::new("Total", ValueKind::Decimal).precision(10, 2))
            .property(
                PropertyDefinition::new("Status", ValueKind::String)
                    .max_length(20)
                    .required(),
            )
    }

    #[test]
    fn test_primary_key_implies_required() {
        let entity = order();
        let id = entity.find_property("id").unwrap();
        assert!(id.required);
        assert!(!id.is_nullable());
        assert_eq!(entity.primary_key().len(), 1);
    }

    #[test]
    fn test_find_property_case_insensitive() {
        let entity = order();
        assert!(entity.find_property("STATUS").is_some());
        assert!(entity.find_property("missing").is_none());
    }

    #[test]
    fn test_resolve_sql_type() {
        let entity = order();
        let status = entity.find_property("Status").unwrap();
        assert_eq!(status.resolve_sql_type(Dialect::Sqlite), "TEXT");
        assert_eq!(status.resolve_sql_type(Dialect::MySql), "VARCHAR(20)");
        assert_eq!(status.resolve_sql_type(Dialect::SqlServer), "NVARCHAR(20)");

        let total = entity.find_property("Total").unwrap();
        assert_eq!(total.resolve_sql_type(Dialect::PostgreSql), "NUMERIC(10,2)");
    }

    #[test]
    fn test_empty_schema_is_none() {
        let entity = EntityDefinition::new("Order").in_schema("");
        assert_eq!(entity.schema(), None);
    }
}
