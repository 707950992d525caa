use crate::{
    db::{
        engine::{Engine, EngineError},
        query::{
            FieldPath, GroupingField, GroupingType, OrderDirection, Predicate, QueryData,
            SummarizeData, SummaryField, SummaryType,
            predicate::{FieldPresence, Row as PredicateRow, eval_at},
        },
        response::{Summary, SummaryGroup},
        wire::{BatchRequest, Row},
    },
    model::{entity::EntityModel, field::FieldKind},
    schema::Schema,
    value::{EntityRef, Value, ValueError, from_wire, to_wire},
};
use serde_json::{Map, Value as Json, json};
use std::{
    cell::{Cell, RefCell},
    cmp::Ordering,
    collections::BTreeMap,
};
use time::{Date, OffsetDateTime};

///
/// StoredRow
///

#[derive(Clone, Debug)]
struct StoredRow {
    values: Row,
    retired: bool,
}

type Table = BTreeMap<i64, StoredRow>;

///
/// MockEngine
///
/// In-memory engine over the registered entity types.
///
/// Rows are stored in wire form. Deleting retires a row: it disappears from
/// regular queries and shows up under `retired_only`. New ids are the
/// largest id of the table plus one. Every write is journaled as a
/// `BatchRequest` so callers can assert on what was sent.
///
/// Archived projects and filter presets have no meaning here and are ignored.
///

#[derive(Debug, Default)]
pub struct MockEngine {
    models: BTreeMap<&'static str, &'static EntityModel>,
    tables: RefCell<BTreeMap<&'static str, Table>>,
    writes: RefCell<Vec<BatchRequest>>,
    finds: Cell<usize>,
    now: Option<OffsetDateTime>,
}

impl MockEngine {
    /// Engine knowing every entity type of `schema`.
    #[must_use]
    pub fn new(schema: &Schema) -> Self {
        schema
            .models()
            .fold(Self::default(), |engine, model| engine.register_model(model))
    }

    #[must_use]
    pub fn register_model(mut self, model: &'static EntityModel) -> Self {
        self.models.insert(model.entity_type, model);
        self
    }

    /// Evaluate relative date filters against a fixed clock.
    #[must_use]
    pub const fn with_clock(mut self, now: OffsetDateTime) -> Self {
        self.now = Some(now);
        self
    }

    /// Store a row without journaling it; returns the new id.
    pub fn insert(&self, entity_type: &str, data: Row) -> Result<i64, EngineError> {
        let model = self.model(entity_type)?;
        self.check_fields(model, &data)?;

        Ok(self.store(model, data))
    }

    /// Writes received through `create`, `update` and `delete`, in order.
    #[must_use]
    pub fn writes(&self) -> Vec<BatchRequest> {
        self.writes.borrow().clone()
    }

    pub fn clear_writes(&self) {
        self.writes.borrow_mut().clear();
    }

    /// Number of `find` calls served.
    #[must_use]
    pub fn find_count(&self) -> usize {
        self.finds.get()
    }

    /// Stored row, retired or not, without projection.
    #[must_use]
    pub fn row(&self, entity_type: &str, id: i64) -> Option<Row> {
        self.tables
            .borrow()
            .get(entity_type)
            .and_then(|table| table.get(&id))
            .map(|stored| stored.values.clone())
    }

    #[must_use]
    pub fn is_retired(&self, entity_type: &str, id: i64) -> bool {
        self.tables
            .borrow()
            .get(entity_type)
            .and_then(|table| table.get(&id))
            .is_some_and(|stored| stored.retired)
    }

    fn model(&self, entity_type: &str) -> Result<&'static EntityModel, EngineError> {
        self.models
            .get(entity_type)
            .copied()
            .ok_or_else(|| EngineError::UnknownEntity(entity_type.to_string()))
    }

    fn check_fields(&self, model: &EntityModel, data: &Row) -> Result<(), EngineError> {
        match data
            .keys()
            .find(|key| key.as_str() != "id" && model.field_by_name(key).is_none())
        {
            Some(key) => Err(EngineError::UnknownField {
                entity_type: model.entity_type.to_string(),
                field: key.clone(),
            }),
            None => Ok(()),
        }
    }

    fn store(&self, model: &'static EntityModel, data: Row) -> i64 {
        let mut tables = self.tables.borrow_mut();
        let table = tables.entry(model.entity_type).or_default();
        let id = table.keys().next_back().map_or(1, |last| last + 1);

        let mut values: Row = model
            .stored_fields()
            .map(|f| (f.name.to_string(), wire_default(f.kind)))
            .collect();
        values.extend(data);
        values.insert("id".to_string(), json!(id));

        table.insert(
            id,
            StoredRow {
                values,
                retired: false,
            },
        );

        id
    }

    fn now(&self) -> OffsetDateTime {
        self.now.unwrap_or_else(OffsetDateTime::now_utc)
    }

    fn journal(&self, request: BatchRequest) {
        self.writes.borrow_mut().push(request);
    }
}

fn wire_default(kind: FieldKind) -> Json {
    to_wire(&kind.default_value()).unwrap_or(Json::Null)
}

impl Engine for MockEngine {
    fn find(&self, query: &QueryData) -> Result<Vec<Row>, EngineError> {
        let model = self.model(query.model.entity_type)?;
        self.finds.set(self.finds.get() + 1);

        let tables = self.tables.borrow();
        let view = TablesView {
            tables: &tables,
            models: &self.models,
        };
        let mut matches = view.matching(
            model.entity_type,
            query.retired_only,
            query.predicate.as_ref(),
            self.now(),
        );

        if !query.order.is_empty() {
            matches.sort_by(|a, b| {
                query
                    .order
                    .iter()
                    .map(|key| {
                        let a = view.resolve(a, &key.field);
                        let b = view.resolve(b, &key.field);
                        let ord = order_values(&a, &b);
                        match key.direction {
                            OrderDirection::Asc => ord,
                            OrderDirection::Desc => ord.reverse(),
                        }
                    })
                    .find(|ord| ord.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
        }

        let rows = match query.limit.filter(|limit| *limit > 0) {
            Some(limit) => {
                let page = query.page.unwrap_or(1).max(1);
                matches
                    .into_iter()
                    .skip((page - 1).saturating_mul(limit))
                    .take(limit)
                    .collect()
            }
            None => matches,
        };

        Ok(rows.into_iter().map(|row| view.project(query, row)).collect())
    }

    fn summarize(&self, query: &SummarizeData) -> Result<Summary, EngineError> {
        let model = self.model(query.model.entity_type)?;

        let tables = self.tables.borrow();
        let view = TablesView {
            tables: &tables,
            models: &self.models,
        };
        let rows = view.matching(model.entity_type, false, query.predicate.as_ref(), self.now());

        Ok(Summary {
            summaries: view.summaries(&rows, &query.summaries)?,
            groups: view.groups(&rows, &query.summaries, &query.grouping)?,
        })
    }

    fn create(&self, entity_type: &str, data: Row) -> Result<Row, EngineError> {
        let model = self.model(entity_type)?;
        self.check_fields(model, &data)?;
        self.journal(BatchRequest::create(entity_type, data.clone()));

        let id = self.store(model, data);
        let mut row = self.row(entity_type, id).unwrap_or_default();
        row.insert("type".to_string(), json!(entity_type));

        Ok(row)
    }

    fn update(&self, entity_type: &str, id: i64, data: Row) -> Result<Row, EngineError> {
        let model = self.model(entity_type)?;
        self.check_fields(model, &data)?;
        self.journal(BatchRequest::update(entity_type, id, data.clone()));

        let mut tables = self.tables.borrow_mut();
        let stored = tables
            .get_mut(model.entity_type)
            .and_then(|table| table.get_mut(&id))
            .filter(|stored| !stored.retired)
            .ok_or_else(|| EngineError::NotFound {
                entity_type: entity_type.to_string(),
                id,
            })?;

        let mut row = data.clone();
        stored.values.extend(data);
        row.insert("type".to_string(), json!(entity_type));
        row.insert("id".to_string(), json!(id));

        Ok(row)
    }

    fn delete(&self, entity_type: &str, id: i64) -> Result<bool, EngineError> {
        let model = self.model(entity_type)?;
        self.journal(BatchRequest::delete(entity_type, id));

        let mut tables = self.tables.borrow_mut();
        let stored = tables
            .get_mut(model.entity_type)
            .and_then(|table| table.get_mut(&id))
            .filter(|stored| !stored.retired);

        Ok(stored.is_some_and(|stored| {
            stored.retired = true;
            true
        }))
    }
}

// Nulls sort first; unordered pairs compare equal.
fn order_values(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_order(b).unwrap_or(Ordering::Equal),
    }
}

// ----------------------------------------------------------------------
// Summaries
// ----------------------------------------------------------------------

fn is_set(value: &Value) -> bool {
    !value.is_null() && value.as_list().is_none_or(|items| !items.is_empty())
}

fn sum_up(summary: SummaryType, values: &[Value]) -> Result<Json, ValueError> {
    let set: Vec<&Value> = values.iter().filter(|v| is_set(v)).collect();
    let checked = values
        .iter()
        .filter(|v| matches!(v, Value::Bool(true)))
        .count();

    let json = match summary {
        SummaryType::RecordCount => json!(values.len()),
        SummaryType::Count => json!(set.len()),
        SummaryType::Checked => json!(checked),
        SummaryType::Unchecked => json!(values.len() - checked),
        SummaryType::Sum => sum(&set),
        SummaryType::Average => average(&set),
        SummaryType::Minimum | SummaryType::Earliest => extreme(&set, Ordering::Less)?,
        SummaryType::Maximum | SummaryType::Latest => extreme(&set, Ordering::Greater)?,
    };

    Ok(json)
}

// Integer sums stay integers; any float widens the whole sum.
fn sum(values: &[&Value]) -> Json {
    if values.iter().all(|v| matches!(v, Value::Int(_))) {
        json!(
            values
                .iter()
                .filter_map(|v| v.as_int())
                .fold(0_i64, i64::saturating_add)
        )
    } else {
        json!(values.iter().filter_map(|v| v.as_float()).sum::<f64>())
    }
}

#[expect(clippy::cast_precision_loss)]
fn average(values: &[&Value]) -> Json {
    let numbers: Vec<f64> = values.iter().filter_map(|v| v.as_float()).collect();
    if numbers.is_empty() {
        return Json::Null;
    }

    json!(numbers.iter().sum::<f64>() / numbers.len() as f64)
}

fn extreme(values: &[&Value], wanted: Ordering) -> Result<Json, ValueError> {
    let best = values.iter().copied().fold(None, |best: Option<&Value>, v| match best {
        Some(b) if v.partial_order(b) != Some(wanted) => Some(b),
        _ => Some(v),
    });

    best.map_or(Ok(Json::Null), to_wire)
}

fn group_key(value: Value, grouping: GroupingType) -> Value {
    if !is_set(&value) {
        return Value::Null;
    }

    match grouping {
        GroupingType::Exact => value,
        GroupingType::EntityType => value
            .as_entity()
            .map_or(Value::Null, |e| Value::Text(e.entity_type.clone())),
        GroupingType::FirstLetter => value
            .as_text()
            .and_then(|text| text.chars().next())
            .map_or(Value::Null, |c| Value::Text(c.to_uppercase().collect())),
        GroupingType::Day | GroupingType::Month | GroupingType::Quarter | GroupingType::Year => {
            calendar_date(&value).map_or(Value::Null, |d| Value::Text(date_bucket(d, grouping)))
        }
        _ => match (grouping.bucket_size(), value) {
            (Some(size), Value::Int(v)) => {
                let size = i64::from(size);
                Value::Int(v.div_euclid(size) * size)
            }
            (Some(size), Value::Float(v)) => {
                let size = f64::from(size);
                Value::Float((v / size).floor() * size)
            }
            _ => Value::Null,
        },
    }
}

const fn calendar_date(value: &Value) -> Option<Date> {
    match value {
        Value::Date(d) => Some(*d),
        Value::DateTime(dt) => Some(dt.date()),
        _ => None,
    }
}

fn date_bucket(date: Date, grouping: GroupingType) -> String {
    let month = u8::from(date.month());

    match grouping {
        GroupingType::Month => format!("{}-{month:02}", date.year()),
        GroupingType::Quarter => format!("{} Q{}", date.year(), (month - 1) / 3 + 1),
        GroupingType::Year => date.year().to_string(),
        _ => date.to_string(),
    }
}

fn group_name(key: &Value) -> String {
    match key {
        Value::Null => String::new(),
        Value::Text(text) => text.clone(),
        Value::Int(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Bool(v) => v.to_string(),
        Value::Entity(e) => e
            .name
            .clone()
            .unwrap_or_else(|| format!("{} {}", e.entity_type, e.id)),
        other => match to_wire(other) {
            Ok(Json::String(text)) => text,
            Ok(json) => json.to_string(),
            Err(_) => String::new(),
        },
    }
}

///
/// TablesView
/// Read-only access to every table during one `find`.
///

struct TablesView<'a> {
    tables: &'a BTreeMap<&'static str, Table>,
    models: &'a BTreeMap<&'static str, &'static EntityModel>,
}

impl<'a> TablesView<'a> {
    /// Rows of `entity_type` in the requested retirement state matching `predicate`.
    fn matching(
        &self,
        entity_type: &str,
        retired: bool,
        predicate: Option<&Predicate>,
        now: OffsetDateTime,
    ) -> Vec<&'a Row> {
        self.tables
            .get(entity_type)
            .into_iter()
            .flat_map(BTreeMap::values)
            .filter(|stored| stored.retired == retired)
            .map(|stored| &stored.values)
            .filter(|row| predicate.is_none_or(|p| eval_at(&MockRow { view: self, row }, p, now)))
            .collect()
    }

    fn lookup(&self, entity: &EntityRef) -> Option<&Row> {
        self.tables
            .get(entity.entity_type.as_str())?
            .get(&entity.id)
            .map(|stored| &stored.values)
    }

    // Display name: the field a relation exposes under the "name" key.
    fn display_name(&self, entity: &EntityRef) -> Option<String> {
        let model = self.models.get(entity.entity_type.as_str())?;
        let field = model.field_by_relation_key("name")?;

        self.lookup(entity)?
            .get(field.name)?
            .as_str()
            .map(ToString::to_string)
    }

    fn named(&self, value: Value) -> Value {
        match value {
            Value::Entity(e) => {
                let name = self.display_name(&e);
                Value::Entity(EntityRef { name, ..e })
            }
            Value::List(items) => Value::List(items.into_iter().map(|v| self.named(v)).collect()),
            other => other,
        }
    }

    fn relation_json(&self, entity: &EntityRef) -> Json {
        let mut object = json!({ "type": entity.entity_type, "id": entity.id });
        if let (Some(name), Some(map)) = (self.display_name(entity), object.as_object_mut()) {
            map.insert("name".to_string(), json!(name));
        }

        object
    }

    /// Decoded value of `path` for `row`, following relations hop by hop.
    fn presence(&self, row: &Row, path: &FieldPath) -> FieldPresence {
        let mut rows = vec![row];
        let mut many = false;

        for hop in path.hops() {
            let relation = hop.owner.storage_field(hop.relation);
            many |= relation.kind == FieldKind::MultiEntity;

            let Ok(next) = rows
                .iter()
                .map(|r| from_wire(relation.kind, r.get(relation.name).unwrap_or(&Json::Null)))
                .collect::<Result<Vec<_>, _>>()
            else {
                return FieldPresence::Missing;
            };

            rows = next
                .iter()
                .flat_map(Value::entities)
                .filter(|e| e.is_type(hop.target.entity_type))
                .filter_map(|e| self.lookup(e))
                .collect();
        }

        let owner = path.owner();
        let field = owner.storage_field(path.field());
        let decode = |r: &Row| {
            from_wire(field.kind, r.get(field.name).unwrap_or(&Json::Null)).map(|v| self.named(v))
        };

        let value = if many {
            rows.iter().copied().map(decode).collect::<Result<Vec<_>, _>>().map(Value::List)
        } else {
            rows.first().copied().map_or(Ok(Value::Null), decode)
        };

        value.map_or(FieldPresence::Missing, FieldPresence::Present)
    }

    fn resolve(&self, row: &Row, path: &FieldPath) -> Value {
        match self.presence(row, path) {
            FieldPresence::Present(value) => value,
            FieldPresence::Missing => Value::Null,
        }
    }

    /// Project a stored row to the query fields, nesting loaded fields into
    /// their relation values.
    fn project(&self, query: &QueryData, row: &Row) -> Row {
        let mut out = Row::new();
        out.insert("type".to_string(), json!(query.model.entity_type));

        for field in &query.fields {
            let raw = row.get(field.name).cloned().unwrap_or(Json::Null);
            let value = if field.kind.is_relation() {
                self.relation_values(raw)
            } else {
                raw
            };
            out.insert(field.name.to_string(), value);
        }

        for path in &query.loading_fields {
            let [hop] = path.hops() else {
                continue;
            };
            let column = hop.relation_name();
            let leaf = path.owner().storage_field(path.field()).name;
            self.nest_loaded(&mut out, column, hop.target.entity_type, leaf);
        }

        out
    }

    fn summaries(
        &self,
        rows: &[&Row],
        fields: &[SummaryField],
    ) -> Result<Map<String, Json>, ValueError> {
        fields
            .iter()
            .map(|summary| {
                let values: Vec<Value> = rows
                    .iter()
                    .map(|row| self.resolve(row, &summary.field))
                    .collect();

                Ok((summary.field.name(), sum_up(summary.summary, &values)?))
            })
            .collect()
    }

    /// Split `rows` on the first grouping level and recurse into the rest.
    /// Groups keep first-seen order until sorted by their value.
    fn groups(
        &self,
        rows: &[&Row],
        fields: &[SummaryField],
        grouping: &[GroupingField],
    ) -> Result<Vec<SummaryGroup>, ValueError> {
        let Some((level, rest)) = grouping.split_first() else {
            return Ok(Vec::new());
        };

        let mut buckets: Vec<(Value, Vec<&Row>)> = Vec::new();
        for &row in rows {
            let key = group_key(self.resolve(row, &level.field), level.grouping);
            match buckets.iter_mut().find(|(k, _)| k.loose_eq(&key)) {
                Some((_, members)) => members.push(row),
                None => buckets.push((key, vec![row])),
            }
        }

        buckets.sort_by(|(a, _), (b, _)| {
            let ord = order_values(a, b);
            match level.direction {
                OrderDirection::Asc => ord,
                OrderDirection::Desc => ord.reverse(),
            }
        });

        buckets
            .into_iter()
            .map(|(key, members)| {
                Ok(SummaryGroup {
                    group_name: group_name(&key),
                    group_value: to_wire(&key)?,
                    summaries: self.summaries(&members, fields)?,
                    groups: self.groups(&members, fields, rest)?,
                })
            })
            .collect()
    }

    fn relation_values(&self, raw: Json) -> Json {
        match raw {
            Json::Array(items) => {
                Json::Array(items.into_iter().map(|v| self.relation_values(v)).collect())
            }
            Json::Object(_) => from_wire(FieldKind::Entity, &raw)
                .ok()
                .and_then(|v| v.as_entity().map(|e| self.relation_json(e)))
                .unwrap_or(raw),
            other => other,
        }
    }

    fn nest_loaded(&self, out: &mut Row, column: &str, target_type: &str, leaf: &str) {
        let Some(relation) = out.get_mut(column) else {
            return;
        };

        let objects: Vec<&mut Json> = match relation {
            Json::Array(items) => items.iter_mut().collect(),
            object @ Json::Object(_) => vec![object],
            _ => Vec::new(),
        };

        for object in objects {
            let Ok(Value::Entity(entity)) = from_wire(FieldKind::Entity, object) else {
                continue;
            };
            if !entity.is_type(target_type) {
                continue;
            }
            let value = self
                .lookup(&entity)
                .and_then(|r| r.get(leaf))
                .cloned()
                .unwrap_or(Json::Null);
            if let Some(map) = object.as_object_mut() {
                map.insert(leaf.to_string(), value);
            }
        }
    }
}

///
/// MockRow
///

struct MockRow<'a> {
    view: &'a TablesView<'a>,
    row: &'a Row,
}

impl PredicateRow for MockRow<'_> {
    fn field(&self, path: &FieldPath) -> FieldPresence {
        self.view.presence(self.row, path)
    }
}
