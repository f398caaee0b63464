//! Error types for model definition and validation.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while describing or validating a declared model.
#[derive(Error, Debug, Diagnostic)]
pub enum ModelError {
    /// Invalid entity definition.
    #[error("invalid entity `{name}`: {message}")]
    #[diagnostic(code(driftless::model::invalid_entity))]
    InvalidEntity { name: String, message: String },

    /// Invalid property definition.
    #[error("invalid property `{entity}.{property}`: {message}")]
    #[diagnostic(code(driftless::model::invalid_property))]
    InvalidProperty {
        entity: String,
        property: String,
        message: String,
    },

    /// Duplicate definition.
    #[error("duplicate {kind} `{name}`")]
    #[diagnostic(code(driftless::model::duplicate))]
    Duplicate { kind: String, name: String },

    /// Provider identity that maps to no supported dialect.
    #[error("unknown database provider `{provider}`")]
    #[diagnostic(
        code(driftless::model::unknown_dialect),
        help("supported dialects are sqlite, mysql, postgresql and sqlserver")
    )]
    UnknownDialect { provider: String },

    /// Validation error with multiple issues.
    #[error("model validation failed with {count} error(s)")]
    #[diagnostic(code(driftless::model::validation_failed))]
    ValidationFailed {
        count: usize,
        #[related]
        errors: Vec<ModelError>,
    },
}

impl ModelError {
    /// Create an invalid entity error.
    pub fn invalid_entity(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEntity {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid property error.
    pub fn invalid_property(
        entity: impl Into<String>,
        property: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidProperty {
            entity: entity.into(),
            property: property.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate definition error.
    pub fn duplicate(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Duplicate {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create an unknown dialect error.
    pub fn unknown_dialect(provider: impl Into<String>) -> Self {
        Self::UnknownDialect {
            provider: provider.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ModelError::invalid_property("Order", "Total", "scale exceeds precision");
        assert_eq!(
            err.to_string(),
            "invalid property `Order.Total`: scale exceeds precision"
        );
    }

    #[test]
    fn test_unknown_dialect_display() {
        let err = ModelError::unknown_dialect("oracle");
        assert!(err.to_string().contains("oracle"));
    }
}
