//! Error types for the migration engine.

use driftless_model::{Dialect, ModelError};
use thiserror::Error;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur during migration operations.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Unknown dialect or missing collaborator.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Declared model failed validation.
    #[error("Invalid model: {0}")]
    Model(#[from] ModelError),

    /// Catalog could not be read.
    #[error("Introspection error: {0}")]
    Introspection(String),

    /// The dialect cannot perform an operation.
    #[error("{operation} is not supported on {dialect}: {reason}")]
    Unsupported {
        /// Operation tag.
        operation: String,
        /// Target dialect.
        dialect: Dialect,
        /// Missing capability and workaround.
        reason: String,
    },

    /// A generated statement failed against the database.
    #[error("Failed to apply '{description}': {source}")]
    Execution {
        /// Description of the failing script.
        description: String,
        /// SQL text of the failing script.
        sql: String,
        /// Underlying failure.
        #[source]
        source: Box<MigrationError>,
    },

    /// History table write failed.
    #[error("History error: {0}")]
    History(String),

    /// Lock acquisition failed.
    #[error("Failed to acquire migration lock: {0}")]
    LockFailed(String),

    /// Backup failed.
    #[error("Backup error: {0}")]
    Backup(String),

    /// The run was cancelled by the caller.
    #[error("Migration cancelled")]
    Cancelled,

    /// A statement exceeded the command timeout.
    #[error("Statement timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// Database operation error.
    #[error("Database error: {0}")]
    Database(String),

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Policy file could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl MigrationError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an introspection error.
    pub fn introspection(msg: impl Into<String>) -> Self {
        Self::Introspection(msg.into())
    }

    /// Create an unsupported operation error.
    pub fn unsupported(
        operation: impl Into<String>,
        dialect: Dialect,
        reason: impl Into<String>,
    ) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            dialect,
            reason: reason.into(),
        }
    }

    /// Wrap a failure with the script that caused it.
    pub fn execution(
        description: impl Into<String>,
        sql: impl Into<String>,
        source: MigrationError,
    ) -> Self {
        Self::Execution {
            description: description.into(),
            sql: sql.into(),
            source: Box::new(source),
        }
    }

    /// Create a history error.
    pub fn history(msg: impl Into<String>) -> Self {
        Self::History(msg.into())
    }

    /// Create a lock failed error.
    pub fn lock_failed(msg: impl Into<String>) -> Self {
        Self::LockFailed(msg.into())
    }

    /// Create a backup error.
    pub fn backup(msg: impl Into<String>) -> Self {
        Self::Backup(msg.into())
    }

    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Whether the error must always be raised, regardless of policy.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Model(_) | Self::Config(_))
    }

    /// Whether the error came from applying scripts.
    pub fn is_execution(&self) -> bool {
        matches!(
            self,
            Self::Execution { .. } | Self::Cancelled | Self::Timeout { .. }
        )
    }
}
