//! Declared model validation.
//!
//! Checks a set of declared entities for problems that would otherwise
//! surface as confusing DDL failures:
//! - Empty table or column names
//! - Duplicate tables (per schema) or columns, compared case-insensitively
//! - Identity columns on non-integer kinds
//! - Decimal scale larger than precision, zero lengths

use std::collections::HashSet;

use crate::entity::{EntityDefinition, PropertyDefinition};
use crate::error::{ModelError, ModelResult};

/// Validator for declared entities.
#[derive(Debug)]
pub struct Validator {
    /// Collected validation errors.
    errors: Vec<ModelError>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Create a new validator.
    pub fn new() -> Self {
        Self { errors: vec![] }
    }

    /// Validate entities, reporting every problem found.
    pub fn validate(&mut self, entities: &[EntityDefinition]) -> ModelResult<()> {
        self.errors.clear();

        let mut seen = HashSet::new();
        for entity in entities {
            let key = (
                entity.schema().map(str::to_lowercase),
                entity.table_name.to_lowercase(),
            );
            if !seen.insert(key) {
                self.errors
                    .push(ModelError::duplicate("table", &entity.table_name));
            }
            self.validate_entity(entity);
        }

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ModelError::ValidationFailed {
                count: self.errors.len(),
                errors: std::mem::take(&mut self.errors),
            })
        }
    }

    fn validate_entity(&mut self, entity: &EntityDefinition) {
        if entity.table_name.trim().is_empty() {
            self.errors
                .push(ModelError::invalid_entity("", "table name is empty"));
        }

        if entity.properties.is_empty() {
            self.errors.push(ModelError::invalid_entity(
                &entity.table_name,
                "entity declares no properties",
            ));
        }

        let mut seen = HashSet::new();
        for property in &entity.properties {
            if !seen.insert(property.name.to_lowercase()) {
                self.errors.push(ModelError::duplicate(
                    "column",
                    format!("{}.{}", entity.table_name, property.name),
                ));
            }
            self.validate_property(entity, property);
        }
    }

    fn validate_property(&mut self, entity: &EntityDefinition, property: &PropertyDefinition) {
        let table = entity.table_name.as_str();

        if property.name.trim().is_empty() {
            self.errors
                .push(ModelError::invalid_property(table, "", "column name is empty"));
        }

        if property.identity && !property.kind.is_integer() {
            self.errors.push(ModelError::invalid_property(
                table,
                &property.name,
                format!("identity requires an integer kind, found {:?}", property.kind),
            ));
        }

        if let (Some(precision), Some(scale)) = (property.precision, property.scale) {
            if scale > precision {
                self.errors.push(ModelError::invalid_property(
                    table,
                    &property.name,
                    format!("scale {} exceeds precision {}", scale, precision),
                ));
            }
        }

        if property.max_length == Some(0) {
            self.errors.push(ModelError::invalid_property(
                table,
                &property.name,
                "max length must be positive",
            ));
        }
    }
}

/// Validate declared entities.
pub fn validate_entities(entities: &[EntityDefinition]) -> ModelResult<()> {
    Validator::new().validate(entities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValueKind;

    fn id() -> PropertyDefinition {
        PropertyDefinition::new("Id", ValueKind::Int64).primary_key().identity()
    }

    #[test]
    fn test_valid_model() {
        let entities = vec![
            EntityDefinition::new("Customer").property(id()),
            EntityDefinition::new("Customer").in_schema("archive").property(id()),
        ];
        assert!(validate_entities(&entities).is_ok());
    }

    #[test]
    fn test_duplicate_table_case_insensitive() {
        let entities = vec![
            EntityDefinition::new("Customer").property(id()),
            EntityDefinition::new("CUSTOMER").property(id()),
        ];
        let err = validate_entities(&entities).unwrap_err();
        assert!(matches!(err, ModelError::ValidationFailed { count: 1, .. }));
    }

    #[test]
    fn test_collects_all_errors() {
        let entities = vec![
            EntityDefinition::new("Invoice")
                .property(id())
                .property(PropertyDefinition::new("id", ValueKind::Int32))
                .property(PropertyDefinition::new("Code", ValueKind::String).identity())
                .property(PropertyDefinition::new("Amount", ValueKind::Decimal).precision(4, 6)),
        ];

        match validate_entities(&entities) {
            Err(ModelError::ValidationFailed { count, errors }) => {
                assert_eq!(count, 3);
                assert!(errors.iter().any(|e| matches!(e, ModelError::Duplicate { .. })));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_entity() {
        let err = validate_entities(&[EntityDefinition::new("Empty")]).unwrap_err();
        assert!(err.to_string().contains("1 error"));
    }
}
