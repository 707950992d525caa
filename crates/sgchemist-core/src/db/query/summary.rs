//! Summary queries.
//!
//! A `SummarizeQuery<E>` aggregates the rows of `E` matching a filter
//! instead of returning them. Grouping fields split the matching rows into
//! nested groups, one level per grouping field, each carrying its own
//! summaries.

use crate::{
    db::query::{FieldPath, OrderDirection, Predicate, QueryError, check_root},
    model::entity::EntityModel,
    traits::EntityKind,
};
use serde::Serialize;
use std::{fmt, marker::PhantomData};

///
/// SummaryType
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryType {
    /// Rows in the group, whatever the field holds.
    RecordCount,
    /// Rows where the field is set.
    Count,
    Sum,
    Average,
    Minimum,
    Maximum,
    Earliest,
    Latest,
    Checked,
    Unchecked,
}

///
/// GroupingType
///
/// How rows are bucketed by a grouping field. Numeric buckets round down to
/// a multiple of their size.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupingType {
    Exact,
    Tens,
    Hundreds,
    Thousands,
    TensOfThousands,
    HundredsOfThousands,
    Millions,
    Day,
    Month,
    Quarter,
    Year,
    EntityType,
    FirstLetter,
}

impl GroupingType {
    /// Width of a numeric bucket.
    #[must_use]
    pub const fn bucket_size(self) -> Option<i32> {
        match self {
            Self::Tens => Some(10),
            Self::Hundreds => Some(100),
            Self::Thousands => Some(1_000),
            Self::TensOfThousands => Some(10_000),
            Self::HundredsOfThousands => Some(100_000),
            Self::Millions => Some(1_000_000),
            _ => None,
        }
    }
}

///
/// SummaryField
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SummaryField {
    pub field: FieldPath,
    pub summary: SummaryType,
}

///
/// GroupingField
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GroupingField {
    pub field: FieldPath,
    pub grouping: GroupingType,
    pub direction: OrderDirection,
}

impl GroupingField {
    /// Order groups of this level by descending group value.
    #[must_use]
    pub fn desc(mut self) -> Self {
        self.direction = OrderDirection::Desc;
        self
    }
}

///
/// SummarizeData
/// Untyped state of a summary query; what engines consume.
///

#[derive(Clone, Debug, PartialEq)]
pub struct SummarizeData {
    pub model: &'static EntityModel,
    pub predicate: Option<Predicate>,
    pub summaries: Vec<SummaryField>,
    pub grouping: Vec<GroupingField>,
    pub include_archived_projects: bool,
}

impl SummarizeData {
    #[must_use]
    pub const fn new(model: &'static EntityModel) -> Self {
        Self {
            model,
            predicate: None,
            summaries: Vec::new(),
            grouping: Vec::new(),
            include_archived_projects: true,
        }
    }
}

///
/// SummarizeQuery
///
/// Typed, immutable summary query over `E`.
///

pub struct SummarizeQuery<E> {
    data: SummarizeData,
    _marker: PhantomData<fn() -> E>,
}

/// Start a summary query over every row of `E`.
#[must_use]
pub fn summarize<E: EntityKind>() -> SummarizeQuery<E> {
    SummarizeQuery::new()
}

impl<E: EntityKind> SummarizeQuery<E> {
    #[must_use]
    pub const fn new() -> Self {
        Self::from_data(SummarizeData::new(E::MODEL))
    }

    const fn from_data(data: SummarizeData) -> Self {
        Self {
            data,
            _marker: PhantomData,
        }
    }

    fn with(&self, f: impl FnOnce(&mut SummarizeData)) -> Self {
        let mut data = self.data.clone();
        f(&mut data);

        Self::from_data(data)
    }

    #[must_use]
    pub const fn data(&self) -> &SummarizeData {
        &self.data
    }

    #[must_use]
    pub fn into_data(self) -> SummarizeData {
        self.data
    }

    /// AND a condition onto the current filter.
    pub fn filter(&self, predicate: Predicate) -> Result<Self, QueryError> {
        for leaf in predicate.leaves() {
            check_root(self.data.model, &leaf.field)?;
        }

        Ok(self.with(|data| {
            data.predicate = Some(match data.predicate.take() {
                Some(current) => current & predicate,
                None => predicate,
            });
        }))
    }

    /// Append summaries to compute.
    pub fn fields<I>(&self, fields: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = SummaryField>,
    {
        let fields: Vec<_> = fields.into_iter().collect();
        for summary in &fields {
            check_root(self.data.model, &summary.field)?;
        }

        Ok(self.with(|data| data.summaries.extend(fields)))
    }

    /// Add a grouping level below the ones already declared.
    pub fn group_by(&self, grouping: GroupingField) -> Result<Self, QueryError> {
        check_root(self.data.model, &grouping.field)?;

        Ok(self.with(|data| data.grouping.push(grouping)))
    }

    #[must_use]
    pub fn reject_archived_projects(&self) -> Self {
        self.with(|data| data.include_archived_projects = false)
    }
}

impl<E: EntityKind> Default for SummarizeQuery<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for SummarizeQuery<E> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E> fmt::Debug for SummarizeQuery<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummarizeQuery")
            .field("data", &self.data)
            .finish()
    }
}
