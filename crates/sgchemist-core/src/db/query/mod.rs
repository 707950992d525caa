//! Query builder modules.
//!
//! A `Query<E>` is an immutable description of a `find` call against the
//! entity type `E`. Builder methods borrow the receiver and return a new
//! query, so a query can be shared and re-composed freely.

pub mod builder;
pub mod predicate;
mod summary;

#[cfg(test)]
mod tests;

use crate::{
    fields::Relation,
    model::{
        entity::EntityModel,
        field::{FieldKind, FieldModel},
    },
    traits::EntityKind,
};
use derive_more::Display;
use serde::Serialize;
use serde_json::{Map, Value as Json};
use std::{fmt, marker::PhantomData};
use thiserror::Error as ThisError;

pub use builder::{Field, FieldPath, Hop};
pub use predicate::{ComparePredicate, DateUnit, LogicalOperator, Operator, Predicate};
pub use summary::{
    GroupingField, GroupingType, SummarizeData, SummarizeQuery, SummaryField, SummaryType,
    summarize,
};

///
/// QueryError
///
/// Query construction failures, raised while building, never at execution.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum QueryError {
    #[error("operator '{op}' is not valid for field '{field}' of kind {kind}")]
    UnsupportedOperator {
        field: String,
        op: Operator,
        kind: FieldKind,
    },

    #[error("operator '{op}' on field '{field}' expects {expected}, found {found}")]
    InvalidOperand {
        field: String,
        op: Operator,
        expected: &'static str,
        found: &'static str,
    },

    #[error("entity '{entity_type}' has no field '{field}'")]
    UnknownField {
        entity_type: &'static str,
        field: String,
    },

    #[error("field '{field}' is not a relation")]
    NotARelation { field: String },

    #[error("relation '{field}' does not target '{target}'")]
    InvalidTarget { field: String, target: String },

    #[error("field '{field}' belongs to '{found}', expected a field of '{expected}'")]
    ForeignField {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("field '{field}' must be a field of '{entity_type}' itself, not a relation path")]
    RelativeField {
        field: String,
        entity_type: &'static str,
    },

    #[error("cannot load '{field}': its relation is not queried")]
    RelationNotQueried { field: String },
}

///
/// OrderDirection
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    #[default]
    #[display("asc")]
    Asc,
    #[display("desc")]
    Desc,
}

///
/// OrderSpec
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderSpec {
    pub field: FieldPath,
    pub direction: OrderDirection,
}

///
/// FilterPreset
/// Named server-side filter with its keyword arguments.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FilterPreset {
    #[serde(rename = "preset_name")]
    pub name: String,
    #[serde(flatten)]
    pub args: Map<String, Json>,
}

///
/// QueryData
///
/// Untyped state of a find query; what engines consume.
///
/// `limit` and `page` are unset unless requested. Projected `fields` always
/// start with the primary field.
///

#[derive(Clone, Debug, PartialEq)]
pub struct QueryData {
    pub model: &'static EntityModel,
    pub fields: Vec<&'static FieldModel>,
    pub predicate: Option<Predicate>,
    pub order: Vec<OrderSpec>,
    pub limit: Option<usize>,
    pub page: Option<usize>,
    pub retired_only: bool,
    pub include_archived_projects: bool,
    pub filter_presets: Vec<FilterPreset>,
    pub loading_fields: Vec<FieldPath>,
}

impl QueryData {
    /// Query of every stored field of `model`.
    #[must_use]
    pub fn new(model: &'static EntityModel) -> Self {
        Self {
            model,
            fields: model.stored_fields().collect(),
            predicate: None,
            order: Vec::new(),
            limit: None,
            page: None,
            retired_only: false,
            include_archived_projects: true,
            filter_presets: Vec::new(),
            loading_fields: Vec::new(),
        }
    }

    /// Whether `relation` is a queried, stored relation field.
    #[must_use]
    pub fn queries_relation(&self, relation: &FieldModel) -> bool {
        relation.kind.is_relation()
            && !relation.is_alias()
            && self.fields.iter().any(|f| f.attr == relation.attr)
    }

    fn check_root(&self, path: &FieldPath) -> Result<(), QueryError> {
        check_root(self.model, path)
    }
}

// Fields used by a query must be rooted at the queried entity.
fn check_root(model: &'static EntityModel, path: &FieldPath) -> Result<(), QueryError> {
    if path.root() == model {
        Ok(())
    } else {
        Err(QueryError::ForeignField {
            field: path.name(),
            expected: model.entity_type,
            found: path.root().entity_type,
        })
    }
}

///
/// Query
///
/// Typed, immutable find query over `E`.
///

pub struct Query<E> {
    data: QueryData,
    _marker: PhantomData<fn() -> E>,
}

/// Start a query projecting every stored field of `E`.
#[must_use]
pub fn select<E: EntityKind>() -> Query<E> {
    Query::new()
}

impl<E: EntityKind> Query<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::from_data(QueryData::new(E::MODEL))
    }

    const fn from_data(data: QueryData) -> Self {
        Self {
            data,
            _marker: PhantomData,
        }
    }

    fn with(&self, f: impl FnOnce(&mut QueryData)) -> Self {
        let mut data = self.data.clone();
        f(&mut data);

        Self::from_data(data)
    }

    #[must_use]
    pub const fn data(&self) -> &QueryData {
        &self.data
    }

    #[must_use]
    pub fn into_data(self) -> QueryData {
        self.data
    }

    /// Narrow the projection. The primary field is always queried; aliases
    /// project the field they narrow.
    pub fn only<I, P>(&self, fields: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<FieldPath>,
    {
        let model = E::MODEL;
        let mut projected: Vec<&'static FieldModel> = model.primary_key().into_iter().collect();

        for path in fields {
            let path = path.as_ref();
            self.data.check_root(path)?;
            if path.is_relative() {
                return Err(QueryError::RelativeField {
                    field: path.name(),
                    entity_type: model.entity_type,
                });
            }

            let field = model.storage_field(path.field());
            if !projected.iter().any(|f| f.attr == field.attr) {
                projected.push(field);
            }
        }

        Ok(self.with(|data| data.fields = projected))
    }

    /// AND a condition onto the current filter.
    pub fn filter(&self, predicate: Predicate) -> Result<Self, QueryError> {
        for leaf in predicate.leaves() {
            self.data.check_root(&leaf.field)?;
        }

        Ok(self.with(|data| {
            data.predicate = Some(match data.predicate.take() {
                Some(current) => current & predicate,
                None => predicate,
            });
        }))
    }

    /// Append a sort criterion.
    pub fn order_by(
        &self,
        field: impl AsRef<FieldPath>,
        direction: OrderDirection,
    ) -> Result<Self, QueryError> {
        let field = field.as_ref();
        self.data.check_root(field)?;

        Ok(self.with(|data| {
            data.order.push(OrderSpec {
                field: field.clone(),
                direction,
            });
        }))
    }

    #[must_use]
    pub fn limit(&self, limit: usize) -> Self {
        self.with(|data| data.limit = Some(limit))
    }

    /// One-based page, sized by `limit`.
    #[must_use]
    pub fn page(&self, page: usize) -> Self {
        self.with(|data| data.page = Some(page))
    }

    #[must_use]
    pub fn retired_only(&self) -> Self {
        self.with(|data| data.retired_only = true)
    }

    #[must_use]
    pub fn reject_archived_projects(&self) -> Self {
        self.with(|data| data.include_archived_projects = false)
    }

    /// Add a server-side filter preset.
    #[must_use]
    pub fn filter_preset<I, K, V>(&self, name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Json>,
    {
        let preset = FilterPreset {
            name: name.into(),
            args: args.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        };

        self.with(|data| data.filter_presets.push(preset))
    }

    /// Fetch fields of related entities alongside each row.
    ///
    /// Each field must be exactly one hop away, through a queried relation.
    pub fn load<I, P>(&self, fields: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<FieldPath>,
    {
        let mut loading = self.data.loading_fields.clone();

        for path in fields {
            let path = path.as_ref();
            self.data.check_root(path)?;

            let [hop] = path.hops() else {
                return Err(QueryError::RelationNotQueried { field: path.name() });
            };
            if !self.data.queries_relation(hop.owner.storage_field(hop.relation)) {
                return Err(QueryError::RelationNotQueried { field: path.name() });
            }

            if !loading.contains(path) {
                loading.push(path.clone());
            }
        }

        Ok(self.with(|data| data.loading_fields = loading))
    }

    /// Load every stored, non-primary field of `T` through `relation`.
    pub fn load_all<T, K>(&self, relation: &Field<E, K>) -> Result<Self, QueryError>
    where
        T: EntityKind,
        K: Relation,
    {
        let paths = T::MODEL
            .stored_fields()
            .filter(|f| !f.primary)
            .map(|f| relation.path().join(&FieldPath::new(T::MODEL, f)))
            .collect::<Result<Vec<_>, _>>()?;

        self.load(paths)
    }
}

impl<E: EntityKind> Default for Query<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Query<E> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E> fmt::Debug for Query<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query").field("data", &self.data).finish()
    }
}
