//! Remote wire shapes.
//!
//! Filters are a list holding at most one node. A leaf is
//! `[field, operator, value]`; a group is
//! `{"filter_operator": "all"|"any", "filters": [...]}`.


use crate::{
    db::query::{
        FilterPreset, GroupingField, GroupingType, LogicalOperator, OrderDirection, OrderSpec,
        Predicate, QueryData, SummarizeData, SummaryField, SummaryType,
    },
    model::field::FieldModel,
    value::{Value, ValueError, to_wire},
};
use derive_more::Display;
use serde::Serialize;
use serde_json::{Map, Value as Json, json};

///
/// Row
/// One remote record, keyed by remote field name.
///

pub type Row = Map<String, Json>;

/// Encode an optional filter tree: `[]` when unfiltered, `[node]` otherwise.
pub fn filters(predicate: Option<&Predicate>) -> Result<Json, ValueError> {
    Ok(match predicate {
        None => json!([]),
        Some(p) => json!([filter_node(p)?]),
    })
}

/// Encode one filter node.
pub fn filter_node(predicate: &Predicate) -> Result<Json, ValueError> {
    match predicate {
        Predicate::Compare(cmp) => Ok(json!([
            cmp.field.name(),
            cmp.op.to_string(),
            to_wire(&cmp.value)?
        ])),
        Predicate::All(children) => group(LogicalOperator::All, children),
        Predicate::Any(children) => group(LogicalOperator::Any, children),
    }
}

fn group(op: LogicalOperator, children: &[Predicate]) -> Result<Json, ValueError> {
    let filters = children.iter().map(filter_node).collect::<Result<Vec<_>, _>>()?;

    Ok(json!({ "filter_operator": op.to_string(), "filters": filters }))
}

///
/// OrderEntry
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct OrderEntry {
    pub field_name: String,
    pub direction: OrderDirection,
}

impl From<&OrderSpec> for OrderEntry {
    fn from(spec: &OrderSpec) -> Self {
        Self {
            field_name: spec.field.name(),
            direction: spec.direction,
        }
    }
}

///
/// FindRequest
///
/// Arguments of a remote `find` call. `limit` and `page` use 0 for unset.
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FindRequest {
    pub entity_type: String,
    pub filters: Json,
    pub fields: Vec<String>,
    pub order: Vec<OrderEntry>,
    pub limit: usize,
    pub retired_only: bool,
    pub page: usize,
    pub include_archived_projects: bool,
    pub additional_filter_presets: Vec<FilterPreset>,
}

impl FindRequest {
    pub fn from_query(query: &QueryData) -> Result<Self, ValueError> {
        let mut fields: Vec<String> = query.fields.iter().map(|f| f.name.to_string()).collect();
        for path in &query.loading_fields {
            let name = path.name();
            if !fields.contains(&name) {
                fields.push(name);
            }
        }

        Ok(Self {
            entity_type: query.model.entity_type.to_string(),
            filters: filters(query.predicate.as_ref())?,
            fields,
            order: query.order.iter().map(OrderEntry::from).collect(),
            limit: query.limit.unwrap_or_default(),
            retired_only: query.retired_only,
            page: query.page.unwrap_or_default(),
            include_archived_projects: query.include_archived_projects,
            additional_filter_presets: query.filter_presets.clone(),
        })
    }
}

///
/// SummaryEntry
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SummaryEntry {
    pub field: String,
    #[serde(rename = "type")]
    pub summary_type: SummaryType,
}

impl From<&SummaryField> for SummaryEntry {
    fn from(summary: &SummaryField) -> Self {
        Self {
            field: summary.field.name(),
            summary_type: summary.summary,
        }
    }
}

///
/// GroupingEntry
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct GroupingEntry {
    pub field: String,
    #[serde(rename = "type")]
    pub grouping_type: GroupingType,
    pub direction: OrderDirection,
}

impl From<&GroupingField> for GroupingEntry {
    fn from(grouping: &GroupingField) -> Self {
        Self {
            field: grouping.field.name(),
            grouping_type: grouping.grouping,
            direction: grouping.direction,
        }
    }
}

///
/// SummarizeRequest
/// Arguments of a remote `summarize` call.
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SummarizeRequest {
    pub entity_type: String,
    pub filters: Json,
    pub summary_fields: Vec<SummaryEntry>,
    pub grouping: Vec<GroupingEntry>,
    pub include_archived_projects: bool,
}

impl SummarizeRequest {
    pub fn from_query(query: &SummarizeData) -> Result<Self, ValueError> {
        Ok(Self {
            entity_type: query.model.entity_type.to_string(),
            filters: filters(query.predicate.as_ref())?,
            summary_fields: query.summaries.iter().map(SummaryEntry::from).collect(),
            grouping: query.grouping.iter().map(GroupingEntry::from).collect(),
            include_archived_projects: query.include_archived_projects,
        })
    }
}

///
/// BatchRequestType
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchRequestType {
    #[display("create")]
    Create,
    #[display("update")]
    Update,
    #[display("delete")]
    Delete,
}

///
/// BatchRequest
///
/// One write of a remote `batch` call.
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchRequest {
    pub request_type: BatchRequestType,
    pub entity_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Row>,
}

impl BatchRequest {
    #[must_use]
    pub fn create(entity_type: impl Into<String>, data: Row) -> Self {
        Self {
            request_type: BatchRequestType::Create,
            entity_type: entity_type.into(),
            entity_id: None,
            data: Some(data),
        }
    }

    #[must_use]
    pub fn update(entity_type: impl Into<String>, id: i64, data: Row) -> Self {
        Self {
            request_type: BatchRequestType::Update,
            entity_type: entity_type.into(),
            entity_id: Some(id),
            data: Some(data),
        }
    }

    #[must_use]
    pub fn delete(entity_type: impl Into<String>, id: i64) -> Self {
        Self {
            request_type: BatchRequestType::Delete,
            entity_type: entity_type.into(),
            entity_id: Some(id),
            data: None,
        }
    }
}

///
/// BatchResult
/// Outcome of one batch write: the returned row, or whether a delete happened.
///

#[derive(Clone, Debug, PartialEq)]
pub enum BatchResult {
    Row(Row),
    Deleted(bool),
}

/// Encode field values into a row keyed by remote name.
pub fn encode_row<'a>(
    values: impl IntoIterator<Item = &'a (&'static FieldModel, Value)>,
) -> Result<Row, ValueError> {
    values
        .into_iter()
        .map(|(field, value)| Ok((field.name.to_string(), to_wire(value)?)))
        .collect()
}
