use crate::model::field::{FieldKind, FieldModel};
use std::fmt;

///
/// EntityModel
/// Minimal, macro-generated runtime model for one entity.
///

#[derive(Debug, Eq, PartialEq)]
pub struct EntityModel {
    /// Remote schema type name (routing key for every engine call).
    pub entity_type: &'static str,
    /// Ordered field list; the primary `id` field comes first.
    pub fields: &'static [FieldModel],
}

impl EntityModel {
    /// Field by local attribute name.
    #[must_use]
    pub fn field(&self, attr: &str) -> Option<&'static FieldModel> {
        self.fields.iter().find(|f| f.attr == attr)
    }

    /// Stored (non-alias) field by remote name.
    #[must_use]
    pub fn field_by_name(&self, name: &str) -> Option<&'static FieldModel> {
        self.stored_fields().find(|f| f.name == name)
    }

    /// Stored field by the key used when this entity is nested in a relation.
    /// Falls back to the remote name.
    #[must_use]
    pub fn field_by_relation_key(&self, key: &str) -> Option<&'static FieldModel> {
        self.stored_fields()
            .find(|f| f.relation_key() == key)
            .or_else(|| self.field_by_name(key))
    }

    /// Index of a field in `fields`, by attribute name.
    #[must_use]
    pub fn position(&self, attr: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.attr == attr)
    }

    #[must_use]
    pub fn primary_key(&self) -> Option<&'static FieldModel> {
        self.fields.iter().find(|f| f.primary)
    }

    /// Fields that hold data (aliases excluded).
    pub fn stored_fields(&self) -> impl Iterator<Item = &'static FieldModel> + use<> {
        let fields: &'static [FieldModel] = self.fields;
        fields.iter().filter(|f| !f.is_alias())
    }

    /// Relation fields that hold data.
    pub fn relation_fields(&self) -> impl Iterator<Item = &'static FieldModel> + use<> {
        self.stored_fields().filter(|f| f.kind.is_relation())
    }

    /// Resolve an alias to the field it narrows; other fields resolve to themselves.
    #[must_use]
    pub fn storage_field(&self, field: &'static FieldModel) -> &'static FieldModel {
        field
            .alias_of
            .and_then(|attr| self.field(attr))
            .unwrap_or(field)
    }

    /// Per-entity declaration checks. Cross-entity checks live in the schema.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.entity_type.is_empty() {
            issues.push("entity type name must not be empty".to_string());
        }

        match self.fields.first() {
            Some(f) if f.primary && f.attr == "id" && f.kind == FieldKind::Number => {}
            _ => issues.push(format!(
                "entity '{}' must declare the primary 'id' number field first",
                self.entity_type
            )),
        }

        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 && field.primary {
                issues.push(format!(
                    "entity '{}' declares a second primary field '{}'",
                    self.entity_type, field.attr
                ));
            }

            if let Some(prev) = self.fields[..i].iter().find(|f| f.attr == field.attr) {
                issues.push(format!(
                    "entity '{}' declares attribute '{}' twice",
                    self.entity_type, prev.attr
                ));
            }

            if !field.is_alias()
                && let Some(prev) = self.fields[..i]
                    .iter()
                    .find(|f| !f.is_alias() && f.name == field.name)
            {
                issues.push(format!(
                    "entity '{}': field named '{}' is already defined by '{}'",
                    self.entity_type, field.name, prev.attr
                ));
            }

            if field.kind.is_relation() && field.targets.is_empty() {
                issues.push(format!(
                    "relation '{}.{}' has no target entity type",
                    self.entity_type, field.attr
                ));
            }

            if !field.kind.is_relation() && !field.targets.is_empty() {
                issues.push(format!(
                    "field '{}.{}' of kind {} cannot declare targets",
                    self.entity_type, field.attr, field.kind
                ));
            }

            if let Some(aliased) = field.alias_of {
                self.validate_alias(field, aliased, &mut issues);
            }
        }

        issues
    }

    fn validate_alias(&self, field: &FieldModel, aliased: &str, issues: &mut Vec<String>) {
        let Some(target) = self.field(aliased) else {
            issues.push(format!(
                "alias '{}.{}' points to unknown field '{aliased}'",
                self.entity_type, field.attr
            ));
            return;
        };

        if !target.kind.is_relation() || target.is_alias() || field.kind != FieldKind::Entity {
            issues.push(format!(
                "alias '{}.{}' must be an entity field narrowing a relation, '{aliased}' is {}",
                self.entity_type, field.attr, target.kind
            ));
            return;
        }

        for t in field.targets {
            if !target.targets_type(t) {
                issues.push(format!(
                    "alias '{}.{}' targets '{t}' which '{aliased}' does not accept",
                    self.entity_type, field.attr
                ));
            }
        }
    }
}

impl fmt::Display for EntityModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.entity_type)
    }
}
