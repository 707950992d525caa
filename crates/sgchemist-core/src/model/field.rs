use crate::value::Value;
use derive_more::Display;

///
/// FieldKind
///
/// Semantic type of a remote field. The display form is the remote
/// data-type name.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum FieldKind {
    #[display("checkbox")]
    Checkbox,
    #[display("date")]
    Date,
    #[display("date_time")]
    DateTime,
    #[display("duration")]
    Duration,
    #[display("entity")]
    Entity,
    #[display("float")]
    Float,
    #[display("image")]
    Image,
    #[display("list")]
    List,
    #[display("multi_entity")]
    MultiEntity,
    #[display("number")]
    Number,
    #[display("percent")]
    Percent,
    #[display("serializable")]
    Serializable,
    #[display("status_list")]
    Status,
    #[display("text")]
    Text,
    #[display("url")]
    Url,
}

impl FieldKind {
    #[must_use]
    pub const fn is_relation(self) -> bool {
        matches!(self, Self::Entity | Self::MultiEntity)
    }

    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Number
                | Self::Float
                | Self::Duration
                | Self::Percent
                | Self::Date
                | Self::DateTime
        )
    }

    #[must_use]
    pub const fn is_date(self) -> bool {
        matches!(self, Self::Date | Self::DateTime)
    }

    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(self, Self::Text | Self::Url | Self::Status)
    }

    /// Value a freshly constructed instance holds for this kind.
    #[must_use]
    pub fn default_value(self) -> Value {
        match self {
            Self::Status => Value::Text("wtg".to_string()),
            Self::MultiEntity => Value::List(Vec::new()),
            _ => Value::Null,
        }
    }

    /// Whether a single (non-list) operand has the shape this kind stores.
    #[must_use]
    pub fn accepts_scalar(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Text | Self::Image | Self::Status | Self::Url | Self::List, Value::Text(_))
            | (Self::Number | Self::Duration, Value::Int(_))
            | (Self::Float | Self::Percent, Value::Float(_) | Value::Int(_))
            | (Self::Checkbox, Value::Bool(_))
            | (Self::Date, Value::Date(_))
            | (Self::DateTime, Value::DateTime(_))
            | (Self::Entity | Self::MultiEntity, Value::Entity(_))
            | (Self::Serializable, Value::Json(_)) => true,
            _ => false,
        }
    }

    /// Whether a value can be stored in a field of this kind.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (Self::MultiEntity | Self::List, Value::List(items)) => {
                items.iter().all(|item| !item.is_null() && self.accepts_scalar(item))
            }
            (Self::MultiEntity | Self::List, _) => value.is_null(),
            _ => self.accepts_scalar(value),
        }
    }
}

///
/// FieldModel
///
/// Declared metadata of one entity field.
///
/// `attr` is the local attribute name, `name` the remote field name.
/// `targets` lists the entity types a relation accepts and is empty for
/// scalar kinds. An alias field (`alias_of`) narrows a multi-target relation
/// to one of its targets; it has no storage of its own.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FieldModel {
    pub attr: &'static str,
    pub name: &'static str,
    pub name_in_relation: Option<&'static str>,
    pub kind: FieldKind,
    pub targets: &'static [&'static str],
    pub primary: bool,
    pub alias_of: Option<&'static str>,
}

impl FieldModel {
    /// The primary `id` field every entity carries.
    pub const PRIMARY_ID: Self = Self {
        attr: "id",
        name: "id",
        name_in_relation: None,
        kind: FieldKind::Number,
        targets: &[],
        primary: true,
        alias_of: None,
    };

    /// Scalar field whose remote name equals the attribute name.
    #[must_use]
    pub const fn new(attr: &'static str, kind: FieldKind) -> Self {
        Self {
            attr,
            name: attr,
            name_in_relation: None,
            kind,
            targets: &[],
            primary: false,
            alias_of: None,
        }
    }

    /// Relation field targeting the given entity types.
    #[must_use]
    pub const fn relation(
        attr: &'static str,
        kind: FieldKind,
        targets: &'static [&'static str],
    ) -> Self {
        Self {
            targets,
            ..Self::new(attr, kind)
        }
    }

    #[must_use]
    pub const fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    #[must_use]
    pub const fn in_relation(mut self, name: &'static str) -> Self {
        self.name_in_relation = Some(name);
        self
    }

    #[must_use]
    pub const fn alias(mut self, aliased_attr: &'static str) -> Self {
        self.alias_of = Some(aliased_attr);
        self
    }

    /// Key of this field when its entity is returned nested in another row.
    #[must_use]
    pub fn relation_key(&self) -> &'static str {
        self.name_in_relation.unwrap_or(self.name)
    }

    #[must_use]
    pub const fn is_alias(&self) -> bool {
        self.alias_of.is_some()
    }

    #[must_use]
    pub fn targets_type(&self, entity_type: &str) -> bool {
        self.targets.contains(&entity_type)
    }
}
