//! SQL dialects understood by the engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// One of the four supported SQL database families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// SQLite.
    #[serde(alias = "sqlite3")]
    Sqlite,
    /// MySQL / MariaDB.
    #[serde(alias = "mariadb")]
    MySql,
    /// PostgreSQL.
    #[serde(alias = "postgres")]
    PostgreSql,
    /// Microsoft SQL Server.
    #[serde(alias = "mssql")]
    SqlServer,
}

impl Dialect {
    /// All supported dialects.
    pub const ALL: [Dialect; 4] = [
        Dialect::Sqlite,
        Dialect::MySql,
        Dialect::PostgreSql,
        Dialect::SqlServer,
    ];

    /// Get the dialect name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::MySql => "mysql",
            Self::PostgreSql => "postgresql",
            Self::SqlServer => "sqlserver",
        }
    }

    /// Resolve a dialect from a connection's provider identity.
    ///
    /// Matching is case-insensitive and accepts the names drivers commonly
    /// report (`Npgsql`, `MySqlConnector`, `Microsoft.Data.SqlClient`, ...).
    pub fn from_provider(provider: &str) -> Option<Self> {
        let provider = provider.trim().to_ascii_lowercase();
        if provider.is_empty() {
            return None;
        }

        if provider.contains("sqlite") {
            Some(Self::Sqlite)
        } else if provider.contains("mysql") || provider.contains("mariadb") {
            Some(Self::MySql)
        } else if provider.contains("postgres") || provider.contains("npgsql") || provider == "pg" {
            Some(Self::PostgreSql)
        } else if provider.contains("sqlserver")
            || provider.contains("mssql")
            || provider.contains("sqlclient")
            || provider.contains("tiberius")
        {
            Some(Self::SqlServer)
        } else {
            None
        }
    }

    /// Quote an identifier, escaping embedded quote characters.
    pub fn quote(&self, ident: &str) -> String {
        match self {
            Self::MySql => format!("`{}`", ident.replace('`', "``")),
            Self::Sqlite | Self::PostgreSql => format!("\"{}\"", ident.replace('"', "\"\"")),
            Self::SqlServer => format!("[{}]", ident.replace(']', "]]")),
        }
    }

    /// Quote a possibly schema-qualified table name.
    pub fn qualify(&self, schema: Option<&str>, name: &str) -> String {
        match schema.filter(|s| !s.is_empty()) {
            Some(schema) => format!("{}.{}", self.quote(schema), self.quote(name)),
            None => self.quote(name),
        }
    }

    /// Render a string literal.
    pub fn string_literal(&self, value: &str) -> String {
        let escaped = value.replace('\'', "''");
        match self {
            Self::SqlServer => format!("N'{}'", escaped),
            _ => format!("'{}'", escaped),
        }
    }

    /// Bind parameter placeholder for the 1-based position `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::Sqlite => format!("?{}", index),
            Self::MySql => "?".to_string(),
            Self::PostgreSql => format!("${}", index),
            Self::SqlServer => format!("@P{}", index),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_provider(s).ok_or_else(|| ModelError::unknown_dialect(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_provider() {
        assert_eq!(Dialect::from_provider("SQLite"), Some(Dialect::Sqlite));
        assert_eq!(Dialect::from_provider("MySqlConnector"), Some(Dialect::MySql));
        assert_eq!(Dialect::from_provider("mariadb"), Some(Dialect::MySql));
        assert_eq!(Dialect::from_provider("Npgsql"), Some(Dialect::PostgreSql));
        assert_eq!(Dialect::from_provider("postgresql"), Some(Dialect::PostgreSql));
        assert_eq!(
            Dialect::from_provider("Microsoft.Data.SqlClient"),
            Some(Dialect::SqlServer)
        );
        assert_eq!(Dialect::from_provider("oracle"), None);
        assert_eq!(Dialect::from_provider("  "), None);
    }

    #[test]
    fn test_from_str_error() {
        let err = "db2".parse::<Dialect>().unwrap_err();
        assert!(matches!(err, ModelError::UnknownDialect { .. }));
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(Dialect::MySql.quote("we`ird"), "`we``ird`");
        assert_eq!(Dialect::PostgreSql.quote("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(Dialect::Sqlite.quote("Order"), "\"Order\"");
        assert_eq!(Dialect::SqlServer.quote("a]b"), "[a]]b]");
    }

    #[test]
    fn test_qualify() {
        assert_eq!(
            Dialect::PostgreSql.qualify(Some("sales"), "Order"),
            "\"sales\".\"Order\""
        );
        assert_eq!(Dialect::SqlServer.qualify(Some(""), "Order"), "[Order]");
        assert_eq!(Dialect::MySql.qualify(None, "Order"), "`Order`");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(Dialect::Sqlite.placeholder(2), "?2");
        assert_eq!(Dialect::MySql.placeholder(2), "?");
        assert_eq!(Dialect::PostgreSql.placeholder(2), "$2");
        assert_eq!(Dialect::SqlServer.placeholder(2), "@P2");
    }

    #[test]
    fn test_deserialize_aliases() {
        #[derive(Deserialize)]
        struct Wrapper {
            dialect: Dialect,
        }

        let w: Wrapper = toml::from_str("dialect = \"postgres\"").unwrap();
        assert_eq!(w.dialect, Dialect::PostgreSql);
        let w: Wrapper = toml::from_str("dialect = \"mssql\"").unwrap();
        assert_eq!(w.dialect, Dialect::SqlServer);
    }
}
