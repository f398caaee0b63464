//! Generated migration scripts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of change a script makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Create a table.
    CreateTable,
    /// Add a column to an existing table.
    AddColumn,
    /// Widen or tighten an existing column.
    AlterColumn,
    /// Drop a column.
    DropColumn,
    /// Drop a table.
    DropTable,
}

impl Operation {
    /// Tag stored in the history table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateTable => "CreateTable",
            Self::AddColumn => "AddColumn",
            Self::AlterColumn => "AlterColumn",
            Self::DropColumn => "DropColumn",
            Self::DropTable => "DropTable",
        }
    }

    /// Whether the operation can lose data.
    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::DropColumn | Self::DropTable)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rendered DDL step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationScript {
    /// Affected table.
    pub table_name: String,
    /// Operation tag.
    pub operation: Operation,
    /// SQL text, statements separated by `;`.
    pub sql: String,
    /// Human-readable description.
    pub description: String,
    /// Individual statements, run in order.
    statements: Vec<String>,
}

impl MigrationScript {
    /// Create a new script.
    pub fn new(
        table_name: impl Into<String>,
        operation: Operation,
        sql: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let sql = sql.into();
        Self {
            table_name: table_name.into(),
            operation,
            statements: vec![sql.clone()],
            sql,
            description: description.into(),
        }
    }

    /// Create a script made of several statements.
    pub fn from_statements(
        table_name: impl Into<String>,
        operation: Operation,
        statements: Vec<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            operation,
            sql: statements.join(";\n"),
            description: description.into(),
            statements,
        }
    }

    /// Statements to run, in order.
    pub fn statements(&self) -> &[String] {
        &self.statements
    }
}

impl fmt::Display for MigrationScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-- {}", self.description)?;
        let sql = self.sql.trim_end();
        if sql.ends_with(';') {
            write!(f, "{}", sql)
        } else {
            write!(f, "{};", sql)
        }
    }
}

/// Render scripts as one SQL document.
pub fn render_scripts(scripts: &[MigrationScript]) -> String {
    scripts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n\n")
}
