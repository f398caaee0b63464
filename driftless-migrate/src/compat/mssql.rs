//! SQL Server type rules.

use driftless_model::Dialect;

use super::{RawType, SqlType, TypeFamily, TypeOracle, UNBOUNDED};

/// Type rules for SQL Server.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlOracle;

impl TypeOracle for MssqlOracle {
    fn dialect(&self) -> Dialect {
        Dialect::SqlServer
    }

    fn classify(&self, type_name: &str) -> SqlType {
        let raw = RawType::parse(type_name);
        match raw.name.as_str() {
            "TINYINT" => SqlType::integer("TINYINT", 1),
            "SMALLINT" => SqlType::integer("SMALLINT", 2),
            "INT" | "INTEGER" => SqlType::integer("INT", 4),
            "BIGINT" => SqlType::integer("BIGINT", 8),

            "CHAR" | "VARCHAR" | "NCHAR" | "NVARCHAR" => {
                SqlType::of(TypeFamily::String, raw.name.clone()).with_capacity(raw.length())
            }
            "TEXT" | "NTEXT" => {
                SqlType::of(TypeFamily::String, raw.name.clone()).with_capacity(Some(UNBOUNDED))
            }

            "BINARY" | "VARBINARY" => {
                SqlType::of(TypeFamily::Binary, raw.name.clone()).with_capacity(raw.length())
            }
            "IMAGE" => SqlType::of(TypeFamily::Binary, "IMAGE").with_capacity(Some(UNBOUNDED)),

            "DECIMAL" | "NUMERIC" => {
                let (precision, scale) = raw.precision_scale();
                SqlType::of(TypeFamily::Decimal, "DECIMAL").with_precision(precision, scale)
            }

            "DATE" | "DATETIME" | "DATETIME2" | "SMALLDATETIME" | "DATETIMEOFFSET" | "TIME" => {
                SqlType::of(TypeFamily::DateTime, raw.name.clone())
            }

            "FLOAT" | "DOUBLE PRECISION" => SqlType::of(TypeFamily::Other, "FLOAT"),
            _ => SqlType::of(TypeFamily::Other, raw.name.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftless_model::{ColumnDefinition, PropertyDefinition, ValueKind};

    #[test]
    fn test_nvarchar_max() {
        let oracle = MssqlOracle;
        let max = ColumnDefinition::new("body", "nvarchar(max)");
        let short = ColumnDefinition::new("body", "nvarchar").max_length(50);

        let no_length = PropertyDefinition::new("body", ValueKind::String);
        let sized = PropertyDefinition::new("body", ValueKind::String).max_length(4000);

        assert!(oracle.is_compatible(&no_length, &max));
        assert!(oracle.is_compatible(&sized, &max));
        assert!(!oracle.is_compatible(&sized, &short));
        assert!(oracle.is_compatible(&no_length, &short));
    }

    #[test]
    fn test_exact_names() {
        let oracle = MssqlOracle;
        let flag = PropertyDefinition::new("flag", ValueKind::Boolean);
        assert!(oracle.is_compatible(&flag, &ColumnDefinition::new("flag", "bit")));
        assert!(!oracle.is_compatible(&flag, &ColumnDefinition::new("flag", "tinyint")));

        let at = PropertyDefinition::new("at", ValueKind::DateTime);
        assert!(oracle.is_compatible(&at, &ColumnDefinition::new("at", "datetime2")));
        assert!(!oracle.is_compatible(&at, &ColumnDefinition::new("at", "datetime")));

        let id = PropertyDefinition::new("id", ValueKind::Guid);
        assert!(oracle.is_compatible(&id, &ColumnDefinition::new("id", "uniqueidentifier")));
    }

    #[test]
    fn test_int_widths() {
        let oracle = MssqlOracle;
        let byte = PropertyDefinition::new("n", ValueKind::Int8);
        assert!(oracle.is_compatible(&byte, &ColumnDefinition::new("n", "smallint")));

        let long = PropertyDefinition::new("n", ValueKind::Int64);
        assert!(!oracle.is_compatible(&long, &ColumnDefinition::new("n", "int")));
    }
}
