//! Error types for PostgreSQL operations.

use driftless_migrate::MigrationError;
use thiserror::Error;

/// Result type for PostgreSQL operations.
pub type PgResult<T> = Result<T, PgError>;

/// Errors that can occur during PostgreSQL operations.
#[derive(Error, Debug)]
pub enum PgError {
    /// Connection pool error.
    #[error("pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// PostgreSQL error.
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Type conversion error.
    #[error("type conversion error: {0}")]
    TypeConversion(String),
}

impl PgError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a type conversion error.
    pub fn type_conversion(message: impl Into<String>) -> Self {
        Self::TypeConversion(message.into())
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Pool(_) => true,
            Self::Postgres(e) => e.is_closed(),
            _ => false,
        }
    }

    /// SQLSTATE code reported by the server, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Postgres(e) => e.code().map(|code| code.code()),
            _ => None,
        }
    }
}

impl From<PgError> for MigrationError {
    fn from(err: PgError) -> Self {
        match err {
            PgError::Config(msg) => MigrationError::configuration(msg),
            PgError::Postgres(e) => match e.as_db_error() {
                Some(db) => MigrationError::database(format!(
                    "{} ({}): {}",
                    db.severity(),
                    db.code().code(),
                    db.message()
                )),
                None => MigrationError::database(e.to_string()),
            },
            other => MigrationError::database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = PgError::config("invalid URL");
        assert!(matches!(err, PgError::Config(_)));
        assert!(!err.is_connection_error());
        assert_eq!(err.sql_state(), None);
    }

    #[test]
    fn test_into_migration_error() {
        let err: MigrationError = PgError::config("missing host").into();
        assert!(err.is_fatal());

        let err: MigrationError = PgError::type_conversion("numeric").into();
        assert!(matches!(err, MigrationError::Database(_)));
    }
}
