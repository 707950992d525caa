use crate::{db::query::FieldPath, traits::EntityKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use thiserror::Error as ThisError;

///
/// ResponseError
/// Errors related to interpreting a materialized find result.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ResponseError {
    #[error("expected exactly one row, found 0 (entity {entity_type})")]
    NotFound { entity_type: &'static str },

    #[error("expected exactly one row, found {count} (entity {entity_type})")]
    NotUnique {
        entity_type: &'static str,
        count: usize,
    },
}

///
/// FindResult
/// Entities returned by one query execution, in remote order.
///

#[derive(Debug)]
pub struct FindResult<E: EntityKind>(Vec<E>);

impl<E: EntityKind> FindResult<E> {
    #[must_use]
    pub const fn new(entities: Vec<E>) -> Self {
        Self(entities)
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.0.iter()
    }

    // ------------------------------------------------------------------
    // Cardinality enforcement
    // ------------------------------------------------------------------

    pub const fn require_one(&self) -> Result<(), ResponseError> {
        match self.len() {
            1 => Ok(()),
            0 => Err(ResponseError::NotFound {
                entity_type: E::ENTITY_TYPE,
            }),
            count => Err(ResponseError::NotUnique {
                entity_type: E::ENTITY_TYPE,
                count,
            }),
        }
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// The first entity, if any.
    #[must_use]
    pub fn first(self) -> Option<E> {
        self.0.into_iter().next()
    }

    /// The only entity; fails on zero or several.
    pub fn one(self) -> Result<E, ResponseError> {
        self.require_one()?;

        self.first().ok_or(ResponseError::NotFound {
            entity_type: E::ENTITY_TYPE,
        })
    }

    #[must_use]
    pub fn all(self) -> Vec<E> {
        self.0
    }
}

impl<E: EntityKind> IntoIterator for FindResult<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, E: EntityKind> IntoIterator for &'a FindResult<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

///
/// Summary
///
/// Result of a summary query. `summaries` are keyed by the remote (dotted)
/// field name; `groups` holds the first grouping level.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Summary {
    pub summaries: Map<String, Json>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<SummaryGroup>,
}

impl Summary {
    /// Summary computed for `field` over every matching row.
    #[must_use]
    pub fn get(&self, field: impl AsRef<FieldPath>) -> Option<&Json> {
        self.summaries.get(&field.as_ref().name())
    }

    /// First-level group whose name is `name`.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&SummaryGroup> {
        self.groups.iter().find(|g| g.group_name == name)
    }
}

///
/// SummaryGroup
/// One bucket of a grouping level, with the levels nested below it.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SummaryGroup {
    pub group_name: String,
    pub group_value: Json,
    pub summaries: Map<String, Json>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<SummaryGroup>,
}

impl SummaryGroup {
    #[must_use]
    pub fn get(&self, field: impl AsRef<FieldPath>) -> Option<&Json> {
        self.summaries.get(&field.as_ref().name())
    }

    #[must_use]
    pub fn group(&self, name: &str) -> Option<&Self> {
        self.groups.iter().find(|g| g.group_name == name)
    }
}
