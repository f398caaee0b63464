//! PostgreSQL type rules.

use driftless_model::Dialect;

use super::{RawType, SqlType, TypeFamily, TypeOracle, UNBOUNDED};

/// Type rules for PostgreSQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresOracle;

impl TypeOracle for PostgresOracle {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSql
    }

    fn classify(&self, type_name: &str) -> SqlType {
        let raw = RawType::parse(type_name);
        match raw.name.as_str() {
            "SMALLINT" | "INT2" | "SMALLSERIAL" | "SERIAL2" => SqlType::integer("SMALLINT", 2),
            "INTEGER" | "INT" | "INT4" | "SERIAL" | "SERIAL4" => SqlType::integer("INTEGER", 4),
            "BIGINT" | "INT8" | "BIGSERIAL" | "SERIAL8" => SqlType::integer("BIGINT", 8),

            "CHARACTER VARYING" | "VARCHAR" => {
                SqlType::of(TypeFamily::String, "VARCHAR").with_capacity(raw.length())
            }
            "CHARACTER" | "CHAR" | "BPCHAR" => {
                SqlType::of(TypeFamily::String, "CHAR").with_capacity(raw.length())
            }
            "TEXT" | "CITEXT" => {
                SqlType::of(TypeFamily::String, raw.name.clone()).with_capacity(Some(UNBOUNDED))
            }

            "BYTEA" => SqlType::of(TypeFamily::Binary, "BYTEA").with_capacity(Some(UNBOUNDED)),

            "NUMERIC" | "DECIMAL" => {
                let (precision, scale) = raw.precision_scale();
                SqlType::of(TypeFamily::Decimal, "NUMERIC").with_precision(precision, scale)
            }

            "TIMESTAMP" | "TIMESTAMP WITHOUT TIME ZONE" => {
                SqlType::of(TypeFamily::DateTime, "TIMESTAMP")
            }
            "TIMESTAMPTZ" | "TIMESTAMP WITH TIME ZONE" => {
                SqlType::of(TypeFamily::DateTime, "TIMESTAMPTZ")
            }
            "TIME" | "TIME WITHOUT TIME ZONE" => SqlType::of(TypeFamily::DateTime, "TIME"),
            "TIMETZ" | "TIME WITH TIME ZONE" => SqlType::of(TypeFamily::DateTime, "TIMETZ"),
            "DATE" => SqlType::of(TypeFamily::DateTime, "DATE"),
            "INTERVAL" => SqlType::of(TypeFamily::DateTime, "INTERVAL"),

            "BOOLEAN" | "BOOL" => SqlType::of(TypeFamily::Other, "BOOLEAN"),
            "REAL" | "FLOAT4" => SqlType::of(TypeFamily::Other, "REAL"),
            "DOUBLE PRECISION" | "FLOAT8" | "FLOAT" => {
                SqlType::of(TypeFamily::Other, "DOUBLE PRECISION")
            }
            _ => SqlType::of(TypeFamily::Other, raw.name.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftless_model::{ColumnDefinition, PropertyDefinition, ValueKind};

    #[test]
    fn test_catalog_names_match_declared_names() {
        let oracle = PostgresOracle;
        let cases = [
            (ValueKind::Boolean, "boolean"),
            (ValueKind::Int32, "integer"),
            (ValueKind::Int64, "bigint"),
            (ValueKind::Float64, "double precision"),
            (ValueKind::Guid, "uuid"),
            (ValueKind::DateTime, "timestamp without time zone"),
            (ValueKind::DateTimeOffset, "timestamp with time zone"),
            (ValueKind::Time, "time without time zone"),
            (ValueKind::Binary, "bytea"),
            (ValueKind::String, "text"),
        ];

        for (kind, data_type) in cases {
            let declared = PropertyDefinition::new("c", kind);
            let actual = ColumnDefinition::new("c", data_type);
            assert!(oracle.is_compatible(&declared, &actual), "{:?} vs {}", kind, data_type);
        }
    }

    #[test]
    fn test_varchar_widening() {
        let oracle = PostgresOracle;
        let actual = ColumnDefinition::new("name", "character varying").max_length(50);

        let wider = PropertyDefinition::new("name", ValueKind::String).max_length(100);
        let narrower = PropertyDefinition::new("name", ValueKind::String).max_length(20);
        let no_length = PropertyDefinition::new("name", ValueKind::String);

        assert!(!oracle.is_compatible(&wider, &actual));
        assert!(oracle.is_compatible(&narrower, &actual));
        assert!(oracle.is_compatible(&no_length, &actual));
        assert!(oracle.is_compatible(&wider, &ColumnDefinition::new("name", "text")));
    }

    #[test]
    fn test_numeric_from_catalog_metadata() {
        let oracle = PostgresOracle;
        let declared = PropertyDefinition::new("total", ValueKind::Decimal).precision(12, 2);

        assert!(!oracle.is_compatible(
            &declared,
            &ColumnDefinition::new("total", "numeric").precision(10, 2)
        ));
        assert!(oracle.is_compatible(
            &declared,
            &ColumnDefinition::new("total", "numeric").precision(14, 4)
        ));
        assert!(oracle.is_compatible(&declared, &ColumnDefinition::new("total", "numeric")));
    }

    #[test]
    fn test_timestamp_granularity_not_coerced() {
        let oracle = PostgresOracle;
        let declared = PropertyDefinition::new("at", ValueKind::DateTimeOffset);
        assert!(!oracle.is_compatible(
            &declared,
            &ColumnDefinition::new("at", "timestamp without time zone")
        ));
        assert!(!oracle.is_compatible(&declared, &ColumnDefinition::new("at", "date")));
    }
}
