//! Dialect capabilities.
//!
//! Generators ask for a [`Capability`] before rendering an operation, so an
//! unsupported operation becomes an error before any SQL reaches the server.

use std::cmp::Ordering;
use std::fmt;

use driftless_model::Dialect;

use crate::error::MigrationError;
use crate::script::Operation;

/// Lowest SQLite release supporting `ALTER TABLE ... DROP COLUMN`.
pub const SQLITE_DROP_COLUMN_VERSION: ServerVersion = ServerVersion::new(3, 35, 0);

/// A dotted server version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ServerVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Patch version.
    pub patch: u32,
}

impl ServerVersion {
    /// Create a version.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse the leading numeric components of a version string such as
    /// `3.45.1`, `8.0.36-0ubuntu0.22.04.1`, `16.2 (Debian 16.2-1)` or
    /// `15.0.2000.5`. Missing components are zero.
    pub fn parse(text: &str) -> Option<Self> {
        let start = text.find(|c: char| c.is_ascii_digit())?;
        let mut parts = text[start..]
            .split(|c: char| !c.is_ascii_digit())
            .take_while(|part| !part.is_empty())
            .map(str::parse::<u32>);

        let major = parts.next()?.ok()?;
        let minor = parts.next().and_then(Result::ok).unwrap_or(0);
        let patch = parts.next().and_then(Result::ok).unwrap_or(0);
        Some(Self::new(major, minor, patch))
    }
}

impl PartialOrd for ServerVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ServerVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Whether a dialect can perform an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    /// Whether the operation is supported.
    pub supported: bool,
    /// Why not, and what to do instead.
    pub reason: String,
}

impl Capability {
    /// A supported operation.
    pub fn supported() -> Self {
        Self {
            supported: true,
            reason: String::new(),
        }
    }

    /// An unsupported operation.
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self {
            supported: false,
            reason: reason.into(),
        }
    }

    /// Turn an unsupported capability into an error.
    pub fn require(self, operation: &str, dialect: Dialect) -> Result<(), MigrationError> {
        if self.supported {
            Ok(())
        } else {
            Err(MigrationError::unsupported(operation, dialect, self.reason))
        }
    }
}

/// Capability of `dialect` at `version` for `operation`. An unknown version
/// is assumed current.
pub fn capability(
    dialect: Dialect,
    version: Option<ServerVersion>,
    operation: Operation,
) -> Capability {
    match (dialect, operation) {
        (Dialect::Sqlite, Operation::DropColumn) => match version {
            Some(v) if v < SQLITE_DROP_COLUMN_VERSION => Capability::unsupported(format!(
                "ALTER TABLE ... DROP COLUMN requires SQLite {} or later (server is {}); \
                 rebuild the table manually or upgrade SQLite",
                SQLITE_DROP_COLUMN_VERSION, v
            )),
            _ => Capability::supported(),
        },
        (Dialect::Sqlite, Operation::AlterColumn) => Capability::unsupported(
            "SQLite cannot change a column's type or nullability in place; \
             the table must be rebuilt manually",
        ),
        _ => Capability::supported(),
    }
}

/// Capability of adding a primary-key column to an existing table.
pub fn add_primary_key_capability(dialect: Dialect) -> Capability {
    match dialect {
        Dialect::Sqlite => Capability::unsupported(
            "SQLite cannot add a PRIMARY KEY column to an existing table; \
             the table must be rebuilt manually",
        ),
        _ => Capability::supported(),
    }
}
