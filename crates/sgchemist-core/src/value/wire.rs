//! Conversion between runtime values and the remote JSON representation.
//!
//! Dates travel as `YYYY-MM-DD`, date-times as RFC 3339 strings, entity
//! references as `{"type", "id"}` objects.

use crate::{
    model::field::FieldKind,
    value::{EntityRef, Value, ValueError},
};
use serde_json::{Number, Value as Json, json};
use time::{
    Date, OffsetDateTime,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Encode a value for the remote API.
pub fn to_wire(value: &Value) -> Result<Json, ValueError> {
    let json = match value {
        Value::Null => Json::Null,
        Value::Bool(v) => Json::Bool(*v),
        Value::Int(v) => Json::from(*v),
        Value::Float(v) => Json::Number(
            Number::from_f64(*v).ok_or(ValueError::NonFiniteFloat { value: *v })?,
        ),
        Value::Text(v) => Json::String(v.clone()),
        Value::Date(v) => Json::String(v.format(DATE_FORMAT).map_err(|e| ValueError::Format {
            value: value.clone(),
            message: e.to_string(),
        })?),
        Value::DateTime(v) => Json::String(v.format(&Rfc3339).map_err(|e| ValueError::Format {
            value: value.clone(),
            message: e.to_string(),
        })?),
        Value::Entity(e) => json!({ "type": e.entity_type, "id": e.id }),
        Value::List(items) => Json::Array(items.iter().map(to_wire).collect::<Result<_, _>>()?),
        Value::Json(v) => v.clone(),
    };

    Ok(json)
}

/// Decode a remote value according to the kind of the field it belongs to.
pub fn from_wire(kind: FieldKind, json: &Json) -> Result<Value, ValueError> {
    if json.is_null() {
        return Ok(match kind {
            FieldKind::MultiEntity => Value::List(Vec::new()),
            _ => Value::Null,
        });
    }

    let unexpected = || ValueError::UnexpectedWire {
        expected: kind,
        found: json.clone(),
    };

    let value = match kind {
        FieldKind::Text | FieldKind::Image | FieldKind::Status | FieldKind::Url => {
            Value::Text(json.as_str().ok_or_else(unexpected)?.to_string())
        }
        FieldKind::Number | FieldKind::Duration => {
            Value::Int(json.as_i64().ok_or_else(unexpected)?)
        }
        FieldKind::Float | FieldKind::Percent => {
            Value::Float(json.as_f64().ok_or_else(unexpected)?)
        }
        FieldKind::Checkbox => Value::Bool(json.as_bool().ok_or_else(unexpected)?),
        FieldKind::Date => Value::Date(parse_date(json.as_str().ok_or_else(unexpected)?)?),
        FieldKind::DateTime => {
            Value::DateTime(parse_date_time(json.as_str().ok_or_else(unexpected)?)?)
        }
        FieldKind::Entity => Value::Entity(entity_ref(json).ok_or_else(unexpected)?),
        FieldKind::MultiEntity => Value::List(
            json.as_array()
                .ok_or_else(unexpected)?
                .iter()
                .map(|item| entity_ref(item).map(Value::Entity).ok_or_else(unexpected))
                .collect::<Result<_, _>>()?,
        ),
        FieldKind::List => Value::List(
            json.as_array()
                .ok_or_else(unexpected)?
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(|s| Value::Text(s.to_string()))
                        .ok_or_else(unexpected)
                })
                .collect::<Result<_, _>>()?,
        ),
        FieldKind::Serializable => Value::Json(json.clone()),
    };

    Ok(value)
}

// Relation values carry at least `type` and `id`; the display name is optional.
fn entity_ref(json: &Json) -> Option<EntityRef> {
    let object = json.as_object()?;
    let entity_type = object.get("type")?.as_str()?;
    let id = object.get("id")?.as_i64()?;
    let name = object
        .get("name")
        .and_then(Json::as_str)
        .map(ToString::to_string);

    Some(EntityRef {
        entity_type: entity_type.to_string(),
        id,
        name,
    })
}

fn parse_date(raw: &str) -> Result<Date, ValueError> {
    Date::parse(raw, DATE_FORMAT).map_err(|e| ValueError::InvalidDate {
        value: raw.to_string(),
        message: e.to_string(),
    })
}

fn parse_date_time(raw: &str) -> Result<OffsetDateTime, ValueError> {
    OffsetDateTime::parse(raw, &Rfc3339).map_err(|e| ValueError::InvalidDate {
        value: raw.to_string(),
        message: e.to_string(),
    })
}
