#[cfg(test)]
mod tests;

use crate::{
    model::{
        entity::EntityModel,
        field::{FieldKind, FieldModel},
    },
    value::{EntityRef, Value},
};
use std::{cell::RefCell, fmt, rc::Rc};
use thiserror::Error as ThisError;

///
/// EntityError
///
/// Misuse of an entity instance: reading what was never fetched, writing
/// what cannot be written, or relating to something not yet persisted.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum EntityError {
    #[error("field '{field}' of '{entity_type}' is not available: it was not queried")]
    MissingField {
        entity_type: &'static str,
        field: &'static str,
    },

    #[error("entity '{entity_type}' has no field '{field}'")]
    UnknownField {
        entity_type: &'static str,
        field: String,
    },

    #[error("field '{field}' of '{entity_type}' cannot be set")]
    ReadOnlyField {
        entity_type: &'static str,
        field: &'static str,
    },

    #[error("field '{field}' of '{entity_type}' ({kind}) cannot hold a {value} value")]
    InvalidValue {
        entity_type: &'static str,
        field: &'static str,
        kind: FieldKind,
        value: &'static str,
    },

    #[error("field '{field}' of '{entity_type}' does not accept '{target}' entities")]
    InvalidTarget {
        entity_type: &'static str,
        field: &'static str,
        target: String,
    },

    #[error("cannot reference a '{entity_type}' that has not been committed")]
    RelationshipNotCommitted { entity_type: &'static str },
}

///
/// Slot
/// Current and last-synchronized value of one field.
/// A slot without snapshot always counts as modified.
///

#[derive(Clone, Debug)]
struct Slot {
    value: Value,
    original: Option<Value>,
    available: bool,
}

impl Slot {
    fn available(value: Value) -> Self {
        Self {
            original: Some(value.clone()),
            value,
            available: true,
        }
    }

    const fn unavailable() -> Self {
        Self {
            value: Value::Null,
            original: None,
            available: false,
        }
    }

    fn is_modified(&self) -> bool {
        self.original
            .as_ref()
            .is_none_or(|original| !self.value.loose_eq(original))
    }

    fn snapshot(&mut self) {
        if self.available {
            self.original = Some(self.value.clone());
        }
    }
}

///
/// RecordState
///

#[derive(Debug)]
struct RecordState {
    model: &'static EntityModel,
    slots: Vec<Slot>,
    pending_add: bool,
    pending_delete: bool,
    deleted: bool,
}

///
/// Record
///
/// Shared handle over the state of one entity instance.
///
/// Clones alias the same state: a record handed out by a session and the
/// copy kept in its identity map observe the same writes. Slots are indexed
/// like `EntityModel::fields`; the primary slot holds the identity.
///

#[derive(Clone)]
pub struct Record(Rc<RefCell<RecordState>>);

impl Record {
    /// Fresh instance: every field available with its kind's default, no identity.
    #[must_use]
    pub fn new(model: &'static EntityModel) -> Self {
        let slots = model
            .fields
            .iter()
            .map(|f| {
                if f.is_alias() {
                    Slot::unavailable()
                } else {
                    Slot::available(f.kind.default_value())
                }
            })
            .collect();

        Self::from_state(model, slots)
    }

    /// Instance materialized from remote data.
    /// Only the given fields are available; their values form the snapshot.
    pub fn loaded(
        model: &'static EntityModel,
        id: i64,
        values: impl IntoIterator<Item = (&'static FieldModel, Value)>,
    ) -> Self {
        let mut slots: Vec<_> = model.fields.iter().map(|_| Slot::unavailable()).collect();
        if let Some(primary) = slots.first_mut() {
            *primary = Slot::available(Value::Int(id));
        }

        for (field, value) in values {
            if let Some(pos) = model.position(field.attr) {
                slots[pos] = Slot::available(value);
            }
        }

        Self::from_state(model, slots)
    }

    fn from_state(model: &'static EntityModel, slots: Vec<Slot>) -> Self {
        Self(Rc::new(RefCell::new(RecordState {
            model,
            slots,
            pending_add: false,
            pending_delete: false,
            deleted: false,
        })))
    }

    #[must_use]
    pub fn model(&self) -> &'static EntityModel {
        self.0.borrow().model
    }

    #[must_use]
    pub fn entity_type(&self) -> &'static str {
        self.model().entity_type
    }

    /// Remote identity; `None` until the instance is persisted.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.0.borrow().slots.first().and_then(|s| s.value.as_int())
    }

    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.id().is_some()
    }

    /// Whether two handles share the same instance.
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Relation value pointing at this instance.
    pub fn to_ref(&self) -> Result<EntityRef, EntityError> {
        let entity_type = self.entity_type();

        self.id()
            .map(|id| EntityRef::new(entity_type, id))
            .ok_or(EntityError::RelationshipNotCommitted { entity_type })
    }

    // ------------------------------------------------------------------
    // Field access
    // ------------------------------------------------------------------

    fn field(&self, attr: &str) -> Result<(usize, &'static FieldModel), EntityError> {
        let model = self.model();

        model
            .position(attr)
            .map(|pos| (pos, &model.fields[pos]))
            .ok_or_else(|| EntityError::UnknownField {
                entity_type: model.entity_type,
                field: attr.to_string(),
            })
    }

    #[must_use]
    pub fn is_available(&self, attr: &str) -> bool {
        let Ok((pos, field)) = self.field(attr) else {
            return false;
        };

        match field.alias_of {
            Some(aliased) => self.is_available(aliased),
            None => self.0.borrow().slots[pos].available,
        }
    }

    /// Current value of a field.
    ///
    /// An alias yields the aliased relation when it points at one of the
    /// alias targets, and null otherwise.
    pub fn get(&self, attr: &str) -> Result<Value, EntityError> {
        let (pos, field) = self.field(attr)?;

        if let Some(aliased) = field.alias_of {
            let value = self.get(aliased)?;
            let matches = value
                .as_entity()
                .is_some_and(|e| field.targets_type(&e.entity_type));

            return Ok(if matches { value } else { Value::Null });
        }

        let state = self.0.borrow();
        let slot = &state.slots[pos];
        if !slot.available {
            return Err(EntityError::MissingField {
                entity_type: state.model.entity_type,
                field: field.attr,
            });
        }

        Ok(slot.value.clone())
    }

    /// Assign a field. Makes an unqueried field available.
    pub fn set(&self, attr: &str, value: Value) -> Result<(), EntityError> {
        let (pos, field) = self.field(attr)?;
        let entity_type = self.entity_type();

        if field.primary || field.is_alias() {
            return Err(EntityError::ReadOnlyField {
                entity_type,
                field: field.attr,
            });
        }

        let value = match (field.kind.is_relation(), value) {
            (true, Value::Null) => field.kind.default_value(),
            (_, value) => value,
        };

        if !field.kind.accepts(&value) {
            return Err(EntityError::InvalidValue {
                entity_type,
                field: field.attr,
                kind: field.kind,
                value: value.label(),
            });
        }

        if let Some(target) = value.entities().find(|e| !field.targets_type(&e.entity_type)) {
            return Err(EntityError::InvalidTarget {
                entity_type,
                field: field.attr,
                target: target.entity_type.clone(),
            });
        }

        let mut state = self.0.borrow_mut();
        let slot = &mut state.slots[pos];
        slot.available = true;
        slot.value = value;

        Ok(())
    }

    /// Stored, non-primary fields currently available, with their values.
    #[must_use]
    pub fn available_values(&self) -> Vec<(&'static FieldModel, Value)> {
        self.collect_slots(|_| true)
    }

    /// Fields whose value differs from the last synchronized snapshot.
    #[must_use]
    pub fn modified_values(&self) -> Vec<(&'static FieldModel, Value)> {
        self.collect_slots(Slot::is_modified)
    }

    #[must_use]
    pub fn is_modified(&self) -> bool {
        !self.modified_values().is_empty()
    }

    fn collect_slots(&self, keep: impl Fn(&Slot) -> bool) -> Vec<(&'static FieldModel, Value)> {
        let state = self.0.borrow();

        state
            .model
            .fields
            .iter()
            .zip(&state.slots)
            .filter(|(f, s)| !f.primary && !f.is_alias() && s.available && keep(s))
            .map(|(f, s)| (f, s.value.clone()))
            .collect()
    }

    // ------------------------------------------------------------------
    // Synchronization
    // ------------------------------------------------------------------

    /// Apply values returned by the remote side and take a new snapshot.
    /// Fields absent from `values` keep their current value.
    pub fn reconcile(
        &self,
        id: Option<i64>,
        values: impl IntoIterator<Item = (&'static FieldModel, Value)>,
    ) {
        let mut state = self.0.borrow_mut();
        let model = state.model;

        if let Some(id) = id
            && let Some(primary) = state.slots.first_mut()
        {
            *primary = Slot::available(Value::Int(id));
        }

        for (field, value) in values {
            if let Some(pos) = model.position(field.attr)
                && !field.primary
            {
                state.slots[pos] = Slot::available(value);
            }
        }

        state.slots.iter_mut().for_each(Slot::snapshot);
    }

    /// Merge freshly fetched values without clobbering local edits.
    pub(crate) fn refresh(&self, values: impl IntoIterator<Item = (&'static FieldModel, Value)>) {
        let mut state = self.0.borrow_mut();
        let model = state.model;

        for (field, value) in values {
            let Some(pos) = model.position(field.attr) else {
                continue;
            };
            let slot = &mut state.slots[pos];
            if !slot.available || !slot.is_modified() {
                *slot = Slot::available(value);
            }
        }
    }

    // ------------------------------------------------------------------
    // Unit-of-work flags
    // ------------------------------------------------------------------

    #[must_use]
    pub fn is_pending_add(&self) -> bool {
        self.0.borrow().pending_add
    }

    #[must_use]
    pub fn is_pending_delete(&self) -> bool {
        self.0.borrow().pending_delete
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.0.borrow().deleted
    }

    pub(crate) fn set_pending_add(&self, pending: bool) {
        self.0.borrow_mut().pending_add = pending;
    }

    pub(crate) fn set_pending_delete(&self, pending: bool) {
        self.0.borrow_mut().pending_delete = pending;
    }

    pub(crate) fn mark_deleted(&self) {
        let mut state = self.0.borrow_mut();
        state.pending_delete = false;
        state.deleted = true;
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.borrow();
        let mut out = f.debug_struct(state.model.entity_type);

        for (field, slot) in state.model.fields.iter().zip(&state.slots) {
            if slot.available {
                out.field(field.attr, &slot.value);
            }
        }

        out.finish_non_exhaustive()
    }
}
