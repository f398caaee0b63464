//! SQLite type rules.
//!
//! SQLite columns have an affinity rather than a type, and declared lengths
//! are never enforced, so types compare by affinity and every text or blob
//! column is unbounded.

use driftless_model::{ColumnDefinition, Dialect, PropertyDefinition};

use super::{RawType, SqlType, TypeFamily, TypeOracle, UNBOUNDED};

/// Type rules for SQLite.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteOracle;

impl SqliteOracle {
    /// Affinity of a declared column type, per SQLite's name rules.
    pub fn affinity(type_name: &str) -> &'static str {
        let name = RawType::parse(type_name).name;
        if name.contains("INT") {
            "INTEGER"
        } else if name.contains("CHAR") || name.contains("CLOB") || name.contains("TEXT") {
            "TEXT"
        } else if name.contains("BLOB") || name.is_empty() {
            "BLOB"
        } else if name.contains("REAL") || name.contains("FLOA") || name.contains("DOUB") {
            "REAL"
        } else {
            "NUMERIC"
        }
    }
}

impl TypeOracle for SqliteOracle {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn classify(&self, type_name: &str) -> SqlType {
        match Self::affinity(type_name) {
            "INTEGER" => SqlType::integer("INTEGER", 8),
            "TEXT" => SqlType::of(TypeFamily::String, "TEXT").with_capacity(Some(UNBOUNDED)),
            "BLOB" => SqlType::of(TypeFamily::Binary, "BLOB").with_capacity(Some(UNBOUNDED)),
            // NUMERIC affinity stores integers and reals alike.
            "NUMERIC" => SqlType::of(TypeFamily::Other, "NUMERIC"),
            other => SqlType::of(TypeFamily::Other, other),
        }
    }

    fn is_compatible(&self, declared: &PropertyDefinition, actual: &ColumnDefinition) -> bool {
        let declared = self.classify_property(declared);
        let actual = self.classify(&actual.data_type);
        if actual.name == "NUMERIC" {
            return matches!(declared.name.as_str(), "INTEGER" | "REAL" | "NUMERIC");
        }
        declared.is_satisfied_by(&actual)
    }
}
