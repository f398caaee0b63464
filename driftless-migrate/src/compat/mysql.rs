//! MySQL type rules.

use driftless_model::Dialect;

use super::{RawType, SqlType, TypeFamily, TypeOracle};

/// Capacity of the LONGTEXT and LONGBLOB tiers.
const LONG_CAPACITY: u64 = 4_294_967_295;

/// Type rules for MySQL and MariaDB.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlOracle;

impl TypeOracle for MySqlOracle {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn classify(&self, type_name: &str) -> SqlType {
        let raw = RawType::parse(type_name);
        match raw.name.as_str() {
            "TINYINT" | "BOOL" | "BOOLEAN" => SqlType::integer("TINYINT", 1),
            "SMALLINT" => SqlType::integer("SMALLINT", 2),
            "MEDIUMINT" => SqlType::integer("MEDIUMINT", 3),
            "INT" | "INTEGER" => SqlType::integer("INT", 4),
            "BIGINT" | "SERIAL" => SqlType::integer("BIGINT", 8),

            "CHAR" | "VARCHAR" | "NCHAR" | "NVARCHAR" => {
                SqlType::of(TypeFamily::String, raw.name.clone()).with_capacity(raw.length())
            }
            "TINYTEXT" => text_tier(&raw, 255),
            "TEXT" => text_tier(&raw, 65_535),
            "MEDIUMTEXT" => text_tier(&raw, 16_777_215),
            "LONGTEXT" => text_tier(&raw, LONG_CAPACITY),

            "BINARY" | "VARBINARY" => {
                SqlType::of(TypeFamily::Binary, raw.name.clone()).with_capacity(raw.length())
            }
            "TINYBLOB" => blob_tier(&raw, 255),
            "BLOB" => blob_tier(&raw, 65_535),
            "MEDIUMBLOB" => blob_tier(&raw, 16_777_215),
            "LONGBLOB" => blob_tier(&raw, LONG_CAPACITY),

            "DECIMAL" | "NUMERIC" | "DEC" | "FIXED" => {
                let (precision, scale) = raw.precision_scale();
                SqlType::of(TypeFamily::Decimal, "DECIMAL").with_precision(precision, scale)
            }

            "DATE" | "DATETIME" | "TIMESTAMP" | "TIME" | "YEAR" => {
                SqlType::of(TypeFamily::DateTime, raw.with_args())
            }

            "DOUBLE" | "DOUBLE PRECISION" | "REAL" => SqlType::of(TypeFamily::Other, "DOUBLE"),
            _ => SqlType::of(TypeFamily::Other, raw.with_args()),
        }
    }
}

fn text_tier(raw: &RawType, capacity: u64) -> SqlType {
    SqlType::of(TypeFamily::String, raw.name.clone()).with_capacity(Some(capacity))
}

fn blob_tier(raw: &RawType, capacity: u64) -> SqlType {
    SqlType::of(TypeFamily::Binary, raw.name.clone()).with_capacity(Some(capacity))
}
