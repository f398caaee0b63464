//! Type compatibility oracle.
//!
//! Decides whether a live column already satisfies a declared property.
//! The rule is widening-only: a column is flagged only when the declared
//! model needs more capacity than the column offers, never when it offers
//! more than needed.
//!
//! | Family   | Compatible when                                   |
//! |----------|---------------------------------------------------|
//! | Integer  | declared byte width ≤ actual byte width           |
//! | String   | declared capacity ≤ actual capacity (or unknown)  |
//! | Binary   | declared capacity ≤ actual capacity (or unknown)  |
//! | Decimal  | declared precision and scale ≤ actual (or unknown)|
//! | DateTime | type names (with fractional precision) are equal  |
//! | Other    | type names are equal                              |
//!
//! Nullability is separate: a nullable column is tightened when the
//! declared property is required, never loosened.

mod mssql;
mod mysql;
mod postgres;
mod sqlite;

pub use mssql::MssqlOracle;
pub use mysql::MySqlOracle;
pub use postgres::PostgresOracle;
pub use sqlite::SqliteOracle;

use driftless_model::{ColumnDefinition, Dialect, PropertyDefinition};

/// Capacity used for unbounded tiers (`TEXT`, `NVARCHAR(MAX)`, ...).
pub const UNBOUNDED: u64 = u64::MAX;

/// Type family used to pick a comparison rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    /// Integers, compared by byte width.
    Integer,
    /// Character types, compared by capacity.
    String,
    /// Exact numerics, compared by precision and scale.
    Decimal,
    /// Dates and times, compared by exact name.
    DateTime,
    /// Byte strings, compared by capacity.
    Binary,
    /// Everything else, compared by exact name.
    Other,
}

/// A classified column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlType {
    /// Comparison family.
    pub family: TypeFamily,
    /// Canonical name, upper case, with arguments where they matter.
    pub name: String,
    /// Byte width for integers.
    pub width: u8,
    /// Capacity for strings and binaries; `None` when unknown.
    pub capacity: Option<u64>,
    /// Precision for decimals.
    pub precision: Option<u32>,
    /// Scale for decimals.
    pub scale: Option<u32>,
}

impl SqlType {
    /// An integer type of `width` bytes.
    pub fn integer(name: impl Into<String>, width: u8) -> Self {
        Self::of(TypeFamily::Integer, name).with_width(width)
    }

    /// A type of the given family with no size information.
    pub fn of(family: TypeFamily, name: impl Into<String>) -> Self {
        Self {
            family,
            name: name.into(),
            width: 0,
            capacity: None,
            precision: None,
            scale: None,
        }
    }

    fn with_width(mut self, width: u8) -> Self {
        self.width = width;
        self
    }

    /// Set the capacity.
    pub fn with_capacity(mut self, capacity: Option<u64>) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set precision and scale.
    pub fn with_precision(mut self, precision: Option<u32>, scale: Option<u32>) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    /// Whether a column of type `actual` satisfies a declared `self`.
    pub fn is_satisfied_by(&self, actual: &SqlType) -> bool {
        if self.family != actual.family {
            return false;
        }

        match self.family {
            TypeFamily::Integer => self.width <= actual.width,
            TypeFamily::String | TypeFamily::Binary => at_most(self.capacity, actual.capacity),
            TypeFamily::Decimal => {
                at_most(self.precision, actual.precision) && at_most(self.scale, actual.scale)
            }
            TypeFamily::DateTime | TypeFamily::Other => self.name == actual.name,
        }
    }
}

fn at_most<T: PartialOrd>(declared: Option<T>, actual: Option<T>) -> bool {
    match (declared, actual) {
        (Some(declared), Some(actual)) => declared <= actual,
        _ => true,
    }
}

/// A type string split into its base name and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawType {
    /// Upper-case base name with modifiers such as `UNSIGNED` removed.
    pub name: String,
    /// Upper-case arguments from the first parenthesized group.
    pub args: Vec<String>,
}

impl RawType {
    /// Split a type string such as `varchar(20)` or `bigint(20) unsigned`.
    pub fn parse(type_name: &str) -> Self {
        let upper = type_name.trim().to_uppercase();
        let (head, args) = match (upper.find('('), upper.rfind(')')) {
            (Some(open), Some(close)) if close > open => {
                let args = upper[open + 1..close]
                    .split(',')
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .collect();
                (format!("{} {}", &upper[..open], &upper[close + 1..]), args)
            }
            _ => (upper.clone(), Vec::new()),
        };

        let name = head
            .split_whitespace()
            .filter(|word| !matches!(*word, "UNSIGNED" | "SIGNED" | "ZEROFILL"))
            .collect::<Vec<_>>()
            .join(" ");

        Self { name, args }
    }

    /// Length argument; `MAX` maps to [`UNBOUNDED`].
    pub fn length(&self) -> Option<u64> {
        let arg = self.args.first()?;
        if arg == "MAX" {
            Some(UNBOUNDED)
        } else {
            arg.parse().ok()
        }
    }

    /// Precision and scale arguments.
    pub fn precision_scale(&self) -> (Option<u32>, Option<u32>) {
        let precision = self.args.first().and_then(|a| a.parse().ok());
        let scale = self.args.get(1).and_then(|a| a.parse().ok());
        (precision, scale)
    }

    /// Base name followed by the arguments, e.g. `DATETIME(6)`.
    pub fn with_args(&self) -> String {
        if self.args.is_empty() {
            self.name.clone()
        } else {
            format!("{}({})", self.name, self.args.join(","))
        }
    }
}

/// Per-dialect type compatibility rules.
pub trait TypeOracle: Send + Sync {
    /// Dialect the rules apply to.
    fn dialect(&self) -> Dialect;

    /// Classify a dialect type string.
    fn classify(&self, type_name: &str) -> SqlType;

    /// Classify a live column, preferring catalog size metadata over what
    /// the type string carries.
    fn classify_column(&self, column: &ColumnDefinition) -> SqlType {
        let mut ty = self.classify(&column.data_type);
        match ty.family {
            TypeFamily::String | TypeFamily::Binary => {
                if column.max_length.is_some() {
                    ty.capacity = column.max_length;
                }
            }
            TypeFamily::Decimal => {
                if column.precision.is_some() {
                    ty.precision = column.precision;
                    ty.scale = column.scale.or(ty.scale);
                }
            }
            _ => {}
        }
        ty
    }

    /// Classify a declared property through its resolved type. A string or
    /// binary property without a max length has unknown capacity, so any
    /// live length satisfies it.
    fn classify_property(&self, property: &PropertyDefinition) -> SqlType {
        let mut ty = self.classify(&property.resolve_sql_type(self.dialect()));
        if property.kind.is_sized() && property.max_length.is_none() {
            ty.capacity = None;
        }
        ty
    }

    /// Whether the live column's type satisfies the declared property.
    fn is_compatible(&self, declared: &PropertyDefinition, actual: &ColumnDefinition) -> bool {
        self.classify_property(declared)
            .is_satisfied_by(&self.classify_column(actual))
    }

    /// Whether the live column must be altered: its type is too narrow, or
    /// it allows NULL while the property is required.
    fn needs_alter(&self, declared: &PropertyDefinition, actual: &ColumnDefinition) -> bool {
        !self.is_compatible(declared, actual) || (!declared.is_nullable() && actual.nullable)
    }
}

/// The oracle for a dialect.
pub fn oracle_for(dialect: Dialect) -> Box<dyn TypeOracle> {
    match dialect {
        Dialect::Sqlite => Box::new(SqliteOracle),
        Dialect::MySql => Box::new(MySqlOracle),
        Dialect::PostgreSql => Box::new(PostgresOracle),
        Dialect::SqlServer => Box::new(MssqlOracle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftless_model::ValueKind;

    #[test]
    fn test_raw_type_parse() {
        let raw = RawType::parse(" bigint(20) unsigned ");
        assert_eq!(raw.name, "BIGINT");
        assert_eq!(raw.args, vec!["20"]);

        let raw = RawType::parse("decimal(10, 2)");
        assert_eq!(raw.precision_scale(), (Some(10), Some(2)));
        assert_eq!(raw.with_args(), "DECIMAL(10,2)");

        let raw = RawType::parse("nvarchar(max)");
        assert_eq!(raw.length(), Some(UNBOUNDED));

        let raw = RawType::parse("timestamp without time zone");
        assert_eq!(raw.name, "TIMESTAMP WITHOUT TIME ZONE");
        assert!(raw.args.is_empty());
    }

    #[test]
    fn test_family_rules() {
        let int = SqlType::integer("INT", 4);
        let big = SqlType::integer("BIGINT", 8);
        assert!(int.is_satisfied_by(&big));
        assert!(!big.is_satisfied_by(&int));

        let s50 = SqlType::of(TypeFamily::String, "VARCHAR").with_capacity(Some(50));
        let s100 = SqlType::of(TypeFamily::String, "VARCHAR").with_capacity(Some(100));
        let unknown = SqlType::of(TypeFamily::String, "CHAR");
        assert!(s50.is_satisfied_by(&s100));
        assert!(!s100.is_satisfied_by(&s50));
        assert!(s100.is_satisfied_by(&unknown));

        let d = |p, s| SqlType::of(TypeFamily::Decimal, "DECIMAL").with_precision(p, s);
        assert!(d(Some(10), Some(2)).is_satisfied_by(&d(Some(12), Some(4))));
        assert!(!d(Some(10), Some(4)).is_satisfied_by(&d(Some(12), Some(2))));
        assert!(d(Some(10), Some(2)).is_satisfied_by(&d(None, None)));

        assert!(!int.is_satisfied_by(&s100));
    }

    #[test]
    fn test_unsized_property_accepts_any_length() {
        let name = PropertyDefinition::new("Name", ValueKind::String);
        let data = PropertyDefinition::new("Data", ValueKind::Binary);

        let cases = [
            (Dialect::PostgreSql, "character varying", "bytea"),
            (Dialect::MySql, "varchar", "varbinary"),
            (Dialect::SqlServer, "nvarchar", "varbinary"),
        ];
        for (dialect, varchar, varbinary) in cases {
            let oracle = oracle_for(dialect);
            let short = ColumnDefinition::new("Name", varchar).max_length(50);
            assert!(!oracle.needs_alter(&name, &short), "{}", dialect);

            let bytes = ColumnDefinition::new("Data", varbinary).max_length(16);
            assert!(!oracle.needs_alter(&data, &bytes), "{}", dialect);
        }
    }

    #[test]
    fn test_nullability_tightening_only() {
        let oracle = oracle_for(Dialect::PostgreSql);
        let nullable = ColumnDefinition::new("Status", "character varying").max_length(20);
        let not_null = nullable.clone().not_null();

        let required = PropertyDefinition::new("Status", ValueKind::String)
            .max_length(20)
            .required();
        let optional = PropertyDefinition::new("Status", ValueKind::String).max_length(20);

        assert!(oracle.needs_alter(&required, &nullable));
        assert!(!oracle.needs_alter(&required, &not_null));
        assert!(!oracle.needs_alter(&optional, &not_null));
        assert!(!oracle.needs_alter(&optional, &nullable));
    }
}
