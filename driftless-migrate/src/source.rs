//! Declared model source.

use driftless_model::EntityDefinition;

use crate::error::MigrateResult;

/// Supplies the declared entities for a run.
pub trait ModelSource: Send + Sync {
    /// Declared entities, in declaration order.
    fn declared_entities(&self) -> MigrateResult<Vec<EntityDefinition>>;
}

impl ModelSource for Vec<EntityDefinition> {
    fn declared_entities(&self) -> MigrateResult<Vec<EntityDefinition>> {
        Ok(self.clone())
    }
}

impl ModelSource for [EntityDefinition] {
    fn declared_entities(&self) -> MigrateResult<Vec<EntityDefinition>> {
        Ok(self.to_vec())
    }
}

impl<F> ModelSource for F
where
    F: Fn() -> MigrateResult<Vec<EntityDefinition>> + Send + Sync,
{
    fn declared_entities(&self) -> MigrateResult<Vec<EntityDefinition>> {
        self()
    }
}
