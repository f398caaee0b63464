//! Live tables, as read from a database catalog.

use serde::{Deserialize, Serialize};

use crate::ident::same_ident;

/// A column as it exists in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Raw dialect type string (e.g. `varchar(100)`, `int4`, `NVARCHAR`).
    pub data_type: String,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Whether the column is part of the primary key.
    pub primary_key: bool,
    /// Whether the database generates values for the column.
    pub identity: bool,
    /// Character or byte length, when the catalog reports one.
    pub max_length: Option<u64>,
    /// Numeric precision, when the catalog reports one.
    pub precision: Option<u32>,
    /// Numeric scale, when the catalog reports one.
    pub scale: Option<u32>,
}

impl ColumnDefinition {
    /// Create a nullable column with no size metadata.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            primary_key: false,
            identity: false,
            max_length: None,
            precision: None,
            scale: None,
        }
    }

    /// Mark the column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Mark the column as primary key (NOT NULL).
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Mark the column as database-generated.
    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    /// Set the reported length.
    pub fn max_length(mut self, length: u64) -> Self {
        self.max_length = Some(length);
        self
    }

    /// Set the reported precision and scale.
    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }
}

/// A table as it exists in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Table name.
    pub name: String,
    /// Schema (or attached database) the table lives in.
    pub schema: Option<String>,
    /// Columns in ordinal order.
    pub columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    /// Create a new table with no columns.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            columns: Vec::new(),
        }
    }

    /// Place the table in a schema.
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Append a column.
    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    /// Schema, ignoring empty strings.
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref().filter(|s| !s.is_empty())
    }

    /// Find a column by case-insensitive name.
    pub fn find_column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| same_ident(&c.name, name))
    }

    /// Whether the table already has a primary key.
    pub fn has_primary_key(&self) -> bool {
        self.columns.iter().any(|c| c.primary_key)
    }

    /// Whether this table is the one an entity with `name` / `schema`
    /// refers to. An absent entity schema matches any table schema.
    pub fn matches(&self, name: &str, schema: Option<&str>) -> bool {
        if !same_ident(&self.name, name) {
            return false;
        }
        match (schema.filter(|s| !s.is_empty()), self.schema()) {
            (None, _) => true,
            (Some(wanted), Some(actual)) => same_ident(wanted, actual),
            (Some(_), None) => false,
        }
    }
}
