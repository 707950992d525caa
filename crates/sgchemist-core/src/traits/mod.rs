use crate::{
    db::record::{EntityError, Record},
    model::entity::EntityModel,
    value::EntityRef,
};

// ============================================================================
// ENTITY KINDS
// ============================================================================
//
// These traits describe *what an entity is*; the state of an instance lives
// in its `Record`.
//

///
/// EntityKind
///
/// A declared entity type: a static model plus a typed handle over a record.
/// Implemented by `entity!`.
///

pub trait EntityKind: Sized + 'static {
    const MODEL: &'static EntityModel;

    /// Remote schema type name.
    const ENTITY_TYPE: &'static str = Self::MODEL.entity_type;

    /// Wrap a record whose model is `Self::MODEL`.
    fn from_record(record: Record) -> Self;

    fn record(&self) -> &Record;

    /// Fresh, unsaved instance.
    #[must_use]
    fn create() -> Self {
        Self::from_record(Record::new(Self::MODEL))
    }

    fn id(&self) -> Option<i64> {
        self.record().id()
    }

    /// Relation value pointing at this instance; fails while uncommitted.
    fn to_ref(&self) -> Result<EntityRef, EntityError> {
        self.record().to_ref()
    }

    /// Whether two handles share the same instance.
    fn same_instance(&self, other: &Self) -> bool {
        self.record().same_instance(other.record())
    }
}

///
/// AsRecord
///
/// Anything a session can track: typed entities and bare records.
/// `entity!` implements it next to `EntityKind`.
///

pub trait AsRecord {
    fn as_record(&self) -> &Record;
}

impl AsRecord for Record {
    fn as_record(&self) -> &Record {
        self
    }
}
