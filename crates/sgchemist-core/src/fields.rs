//! Typed field markers.
//!
//! Each marker names one `FieldKind` at the type level. Typed descriptors
//! (`Field<E, K>`) and generated accessors use the marker to pick the Rust
//! type of the stored value and the set of filter operators the kind allows.

use crate::{
    model::field::FieldKind,
    value::{EntityRef, Value},
};
use time::{Date as CalendarDate, OffsetDateTime};

///
/// FieldType
///
/// `Value` is what instance accessors read and write.
/// `Operand` is what single-value filter operators take; it differs from
/// `Value` only for collection kinds, which are filtered element-wise.
///

pub trait FieldType: 'static {
    const KIND: FieldKind;

    type Value;
    type Operand: Into<Value>;

    fn into_value(value: Self::Value) -> Value;

    fn from_value(value: &Value) -> Option<Self::Value>;
}

/// Kinds supporting `greater_than`, `less_than`, `between` and membership.
pub trait Numeric: FieldType {}

/// Kinds supporting substring operators.
pub trait Textual: FieldType {}

/// Non-date numeric kinds: sums, averages and numeric grouping buckets.
pub trait Quantity: Numeric {}

/// Kinds supporting relative date operators.
pub trait Dated: Numeric {}

/// Kinds supporting `in` / `not_in`.
pub trait Membership: FieldType {}

/// Relation kinds: traversal and entity-specific operators.
pub trait Relation: FieldType<Operand = EntityRef> {}

// Declares a scalar marker whose value converts through `Value` directly.
macro_rules! scalar_field {
    ($name:ident, $kind:ident, $ty:ty, $variant:ident) => {
        #[derive(Clone, Copy, Debug)]
        pub struct $name;

        impl FieldType for $name {
            const KIND: FieldKind = FieldKind::$kind;

            type Value = $ty;
            type Operand = $ty;

            fn into_value(value: Self::Value) -> Value {
                Value::$variant(value)
            }

            fn from_value(value: &Value) -> Option<Self::Value> {
                match value {
                    Value::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

scalar_field!(Text, Text, String, Text);
scalar_field!(Url, Url, String, Text);
scalar_field!(Image, Image, String, Text);
scalar_field!(Status, Status, String, Text);
scalar_field!(Number, Number, i64, Int);
scalar_field!(Duration, Duration, i64, Int);
scalar_field!(Checkbox, Checkbox, bool, Bool);
scalar_field!(Date, Date, CalendarDate, Date);
scalar_field!(DateTime, DateTime, OffsetDateTime, DateTime);
scalar_field!(Serializable, Serializable, serde_json::Value, Json);
scalar_field!(Entity, Entity, EntityRef, Entity);

///
/// Float
/// Float and Percent read integer payloads as floats.
///

#[derive(Clone, Copy, Debug)]
pub struct Float;

#[derive(Clone, Copy, Debug)]
pub struct Percent;

impl FieldType for Float {
    const KIND: FieldKind = FieldKind::Float;

    type Value = f64;
    type Operand = f64;

    fn into_value(value: Self::Value) -> Value {
        Value::Float(value)
    }

    fn from_value(value: &Value) -> Option<Self::Value> {
        value.as_float()
    }
}

impl FieldType for Percent {
    const KIND: FieldKind = FieldKind::Percent;

    type Value = f64;
    type Operand = f64;

    fn into_value(value: Self::Value) -> Value {
        Value::Float(value)
    }

    fn from_value(value: &Value) -> Option<Self::Value> {
        value.as_float()
    }
}

///
/// List
///

#[derive(Clone, Copy, Debug)]
pub struct List;

impl FieldType for List {
    const KIND: FieldKind = FieldKind::List;

    type Value = Vec<String>;
    type Operand = String;

    fn into_value(value: Self::Value) -> Value {
        Value::List(value.into_iter().map(Value::Text).collect())
    }

    fn from_value(value: &Value) -> Option<Self::Value> {
        value
            .as_list()?
            .iter()
            .map(|v| v.as_text().map(ToString::to_string))
            .collect()
    }
}

///
/// MultiEntity
///

#[derive(Clone, Copy, Debug)]
pub struct MultiEntity;

impl FieldType for MultiEntity {
    const KIND: FieldKind = FieldKind::MultiEntity;

    type Value = Vec<EntityRef>;
    type Operand = EntityRef;

    fn into_value(value: Self::Value) -> Value {
        Value::List(value.into_iter().map(Value::Entity).collect())
    }

    fn from_value(value: &Value) -> Option<Self::Value> {
        value
            .as_list()?
            .iter()
            .map(|v| v.as_entity().cloned())
            .collect()
    }
}

impl Numeric for Number {}
impl Numeric for Float {}
impl Numeric for Duration {}
impl Numeric for Percent {}
impl Numeric for Date {}
impl Numeric for DateTime {}

impl Quantity for Number {}
impl Quantity for Float {}
impl Quantity for Duration {}
impl Quantity for Percent {}

impl Dated for Date {}
impl Dated for DateTime {}

impl Textual for Text {}
impl Textual for Url {}
impl Textual for Status {}

impl Membership for Number {}
impl Membership for Float {}
impl Membership for Duration {}
impl Membership for Percent {}
impl Membership for Date {}
impl Membership for DateTime {}
impl Membership for Text {}
impl Membership for Url {}
impl Membership for Status {}
impl Membership for List {}
impl Membership for Entity {}
impl Membership for MultiEntity {}

impl Relation for Entity {}
impl Relation for MultiEntity {}
