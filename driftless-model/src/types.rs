//! Logical value types and the per-dialect type tables.

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;

/// Default precision for decimals declared without one.
pub const DEFAULT_DECIMAL_PRECISION: u32 = 18;
/// Default scale for decimals declared without one.
pub const DEFAULT_DECIMAL_SCALE: u32 = 2;

/// Logical value type of a declared property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Boolean.
    Boolean,
    /// 8-bit integer.
    Int8,
    /// 16-bit integer.
    Int16,
    /// 32-bit integer.
    Int32,
    /// 64-bit integer.
    Int64,
    /// Single precision float.
    Float32,
    /// Double precision float.
    Float64,
    /// Exact numeric with precision and scale.
    Decimal,
    /// Character data.
    String,
    /// Date and time without offset.
    DateTime,
    /// Date and time with offset.
    DateTimeOffset,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// 128-bit unique identifier.
    Guid,
    /// Raw bytes.
    Binary,
}

impl ValueKind {
    /// Check if this is an integer kind.
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    /// Check if values of this kind carry a maximum length.
    pub fn is_sized(&self) -> bool {
        matches!(self, Self::String | Self::Binary)
    }

    /// Resolve the column type for this kind in the given dialect.
    pub fn sql_type(
        &self,
        dialect: Dialect,
        max_length: Option<u64>,
        precision: Option<u32>,
        scale: Option<u32>,
    ) -> String {
        match dialect {
            Dialect::Sqlite => sqlite_type(*self).to_string(),
            Dialect::MySql => mysql_type(*self, max_length, precision, scale),
            Dialect::PostgreSql => postgres_type(*self, max_length, precision, scale),
            Dialect::SqlServer => mssql_type(*self, max_length, precision, scale),
        }
    }

    /// Literal used to backfill existing rows when a required column is
    /// added without an explicit default.
    ///
    /// MySQL fills implicit defaults on `ADD COLUMN` itself and rejects
    /// literal defaults on TEXT/BLOB columns, so it gets none.
    pub fn zero_literal(&self, dialect: Dialect) -> Option<&'static str> {
        if dialect == Dialect::MySql {
            return None;
        }

        let literal = match self {
            Self::Boolean if dialect == Dialect::PostgreSql => "FALSE",
            Self::Boolean
            | Self::Int8
            | Self::Int16
            | Self::Int32
            | Self::Int64
            | Self::Float32
            | Self::Float64
            | Self::Decimal => "0",
            Self::String => "''",
            Self::DateTime | Self::DateTimeOffset => "'1970-01-01 00:00:00'",
            Self::Date => "'1970-01-01'",
            Self::Time => "'00:00:00'",
            Self::Guid => "'00000000-0000-0000-0000-000000000000'",
            Self::Binary => match dialect {
                Dialect::Sqlite => "X''",
                Dialect::SqlServer => "0x",
                _ => "''",
            },
        };
        Some(literal)
    }
}

fn decimal_args(precision: Option<u32>, scale: Option<u32>) -> (u32, u32) {
    (
        precision.unwrap_or(DEFAULT_DECIMAL_PRECISION),
        scale.unwrap_or(DEFAULT_DECIMAL_SCALE),
    )
}

fn sqlite_type(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Boolean
        | ValueKind::Int8
        | ValueKind::Int16
        | ValueKind::Int32
        | ValueKind::Int64 => "INTEGER",
        ValueKind::Float32 | ValueKind::Float64 | ValueKind::Decimal => "REAL",
        ValueKind::String
        | ValueKind::Guid
        | ValueKind::DateTime
        | ValueKind::DateTimeOffset
        | ValueKind::Date
        | ValueKind::Time => "TEXT",
        ValueKind::Binary => "BLOB",
    }
}

fn mysql_type(
    kind: ValueKind,
    max_length: Option<u64>,
    precision: Option<u32>,
    scale: Option<u32>,
) -> String {
    match kind {
        ValueKind::Boolean => "TINYINT(1)".to_string(),
        ValueKind::Int8 => "TINYINT".to_string(),
        ValueKind::Int16 => "SMALLINT".to_string(),
        ValueKind::Int32 => "INT".to_string(),
        ValueKind::Int64 => "BIGINT".to_string(),
        ValueKind::Float32 => "FLOAT".to_string(),
        ValueKind::Float64 => "DOUBLE".to_string(),
        ValueKind::Decimal => {
            let (p, s) = decimal_args(precision, scale);
            format!("DECIMAL({},{})", p, s)
        }
        // utf8mb4 rows top out at 16383 characters for VARCHAR
        ValueKind::String => match max_length {
            Some(n) if n <= 16_383 => format!("VARCHAR({})", n),
            Some(n) if n <= 65_535 => "TEXT".to_string(),
            Some(n) if n <= 16_777_215 => "MEDIUMTEXT".to_string(),
            _ => "LONGTEXT".to_string(),
        },
        ValueKind::Guid => "CHAR(36)".to_string(),
        ValueKind::DateTime | ValueKind::DateTimeOffset => "DATETIME(6)".to_string(),
        ValueKind::Date => "DATE".to_string(),
        ValueKind::Time => "TIME(6)".to_string(),
        ValueKind::Binary => match max_length {
            Some(n) if n <= 65_535 => format!("VARBINARY({})", n),
            Some(n) if n <= 16_777_215 => "MEDIUMBLOB".to_string(),
            _ => "LONGBLOB".to_string(),
        },
    }
}

fn postgres_type(
    kind: ValueKind,
    max_length: Option<u64>,
    precision: Option<u32>,
    scale: Option<u32>,
) -> String {
    match kind {
        ValueKind::Boolean => "BOOLEAN".to_string(),
        ValueKind::Int8 | ValueKind::Int16 => "SMALLINT".to_string(),
        ValueKind::Int32 => "INTEGER".to_string(),
        ValueKind::Int64 => "BIGINT".to_string(),
        ValueKind::Float32 => "REAL".to_string(),
        ValueKind::Float64 => "DOUBLE PRECISION".to_string(),
        ValueKind::Decimal => {
            let (p, s) = decimal_args(precision, scale);
            format!("NUMERIC({},{})", p, s)
        }
        ValueKind::String => match max_length {
            Some(n) if n <= 10_485_760 => format!("VARCHAR({})", n),
            _ => "TEXT".to_string(),
        },
        ValueKind::Guid => "UUID".to_string(),
        ValueKind::DateTime => "TIMESTAMP".to_string(),
        ValueKind::DateTimeOffset => "TIMESTAMPTZ".to_string(),
        ValueKind::Date => "DATE".to_string(),
        ValueKind::Time => "TIME".to_string(),
        ValueKind::Binary => "BYTEA".to_string(),
    }
}

fn mssql_type(
    kind: ValueKind,
    max_length: Option<u64>,
    precision: Option<u32>,
    scale: Option<u32>,
) -> String {
    match kind {
        ValueKind::Boolean => "BIT".to_string(),
        ValueKind::Int8 => "TINYINT".to_string(),
        ValueKind::Int16 => "SMALLINT".to_string(),
        ValueKind::Int32 => "INT".to_string(),
        ValueKind::Int64 => "BIGINT".to_string(),
        ValueKind::Float32 => "REAL".to_string(),
        ValueKind::Float64 => "FLOAT".to_string(),
        ValueKind::Decimal => {
            let (p, s) = decimal_args(precision, scale);
            format!("DECIMAL({},{})", p, s)
        }
        ValueKind::String => match max_length {
            Some(n) if n <= 4_000 => format!("NVARCHAR({})", n),
            _ => "NVARCHAR(MAX)".to_string(),
        },
        ValueKind::Guid => "UNIQUEIDENTIFIER".to_string(),
        ValueKind::DateTime => "DATETIME2".to_string(),
        ValueKind::DateTimeOffset => "DATETIMEOFFSET".to_string(),
        ValueKind::Date => "DATE".to_string(),
        ValueKind::Time => "TIME".to_string(),
        ValueKind::Binary => match max_length {
            Some(n) if n <= 8_000 => format!("VARBINARY({})", n),
            _ => "VARBINARY(MAX)".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_affinities() {
        assert_eq!(ValueKind::Int32.sql_type(Dialect::Sqlite, None, None, None), "INTEGER");
        assert_eq!(ValueKind::Boolean.sql_type(Dialect::Sqlite, None, None, None), "INTEGER");
        assert_eq!(
            ValueKind::Decimal.sql_type(Dialect::Sqlite, None, Some(10), Some(2)),
            "REAL"
        );
        assert_eq!(
            ValueKind::String.sql_type(Dialect::Sqlite, Some(20), None, None),
            "TEXT"
        );
        assert_eq!(ValueKind::Binary.sql_type(Dialect::Sqlite, None, None, None), "BLOB");
    }

    #[test]
    fn test_mysql_string_tiers() {
        let t = |len| ValueKind::String.sql_type(Dialect::MySql, len, None, None);
        assert_eq!(t(Some(50)), "VARCHAR(50)");
        assert_eq!(t(Some(20_000)), "TEXT");
        assert_eq!(t(Some(1_000_000)), "MEDIUMTEXT");
        assert_eq!(t(None), "LONGTEXT");
    }

    #[test]
    fn test_decimal_defaults() {
        assert_eq!(
            ValueKind::Decimal.sql_type(Dialect::PostgreSql, None, None, None),
            "NUMERIC(18,2)"
        );
        assert_eq!(
            ValueKind::Decimal.sql_type(Dialect::SqlServer, None, Some(10), Some(4)),
            "DECIMAL(10,4)"
        );
    }

    #[test]
    fn test_mssql_max_types() {
        assert_eq!(
            ValueKind::String.sql_type(Dialect::SqlServer, Some(5000), None, None),
            "NVARCHAR(MAX)"
        );
        assert_eq!(
            ValueKind::Binary.sql_type(Dialect::SqlServer, Some(16), None, None),
            "VARBINARY(16)"
        );
    }

    #[test]
    fn test_zero_literals() {
        assert_eq!(ValueKind::Boolean.zero_literal(Dialect::PostgreSql), Some("FALSE"));
        assert_eq!(ValueKind::Boolean.zero_literal(Dialect::SqlServer), Some("0"));
        assert_eq!(ValueKind::String.zero_literal(Dialect::Sqlite), Some("''"));
        assert_eq!(ValueKind::String.zero_literal(Dialect::MySql), None);
    }
}
