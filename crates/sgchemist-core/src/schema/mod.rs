mod validate;

#[cfg(test)]
mod tests;

use crate::{model::entity::EntityModel, traits::EntityKind};
use std::{collections::BTreeMap, fmt};
use thiserror::Error as ThisError;

///
/// SchemaError
///
/// Entity declaration problems, reported when the schema is built.
/// Every issue found is listed, not only the first.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SchemaError {
    #[error("invalid schema: {}", issues.join("; "))]
    Invalid { issues: Vec<String> },
}

impl SchemaError {
    #[must_use]
    pub fn issues(&self) -> &[String] {
        match self {
            Self::Invalid { issues } => issues,
        }
    }
}

///
/// Schema
///
/// Immutable registry of entity models keyed by remote type name.
///

#[derive(Clone, Default, Eq, PartialEq)]
pub struct Schema {
    entities: BTreeMap<&'static str, &'static EntityModel>,
}

impl Schema {
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Model registered under `entity_type`.
    #[must_use]
    pub fn entity(&self, entity_type: &str) -> Option<&'static EntityModel> {
        self.entities.get(entity_type).copied()
    }

    #[must_use]
    pub fn contains(&self, entity_type: &str) -> bool {
        self.entities.contains_key(entity_type)
    }

    /// Registered models, ordered by type name.
    pub fn models(&self) -> impl Iterator<Item = &'static EntityModel> + '_ {
        self.entities.values().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entities.keys()).finish()
    }
}

///
/// SchemaBuilder
///
/// Explicit registration step; `build` validates the whole set at once.
///

#[derive(Clone, Debug, Default)]
pub struct SchemaBuilder {
    models: Vec<&'static EntityModel>,
}

impl SchemaBuilder {
    #[must_use]
    pub fn register<E: EntityKind>(self) -> Self {
        self.register_model(E::MODEL)
    }

    #[must_use]
    pub fn register_model(mut self, model: &'static EntityModel) -> Self {
        self.models.push(model);
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        let issues = validate::validate_schema(&self.models);
        if !issues.is_empty() {
            return Err(SchemaError::Invalid { issues });
        }

        let entities = self
            .models
            .into_iter()
            .map(|model| (model.entity_type, model))
            .collect();

        Ok(Schema { entities })
    }
}
