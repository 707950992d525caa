//! Module: session
//! Responsibility: unit of work over an engine: materializing rows into
//! records, tracking pending writes, and committing them in order.
//! Does not own: query construction or wire transport.
//! Boundary: one session per logical transaction; records are shared handles.


use crate::{
    db::{
        engine::Engine,
        query::{Query, SummarizeQuery},
        record::{EntityError, Record},
        response::{FindResult, Summary},
        wire::{BatchRequest, BatchRequestType, Row, encode_row},
    },
    error::Error,
    model::{entity::EntityModel, field::FieldModel},
    obs::sink::{self, MetricsEvent, MetricsSink, WriteKind},
    schema::Schema,
    traits::{AsRecord, EntityKind},
    value::{EntityRef, Value, ValueError, from_wire},
};
use serde_json::Value as Json;
use std::collections::HashMap;
use thiserror::Error as ThisError;

///
/// SessionError
///
/// Unit-of-work misuse and malformed remote rows.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SessionError {
    #[error("entity type '{entity_type}' is not registered in the schema")]
    UnknownEntityType { entity_type: String },

    #[error("cannot add '{entity_type}': it is pending deletion")]
    AddPendingDelete { entity_type: &'static str },

    #[error("cannot add '{entity_type}': it was deleted")]
    AddDeleted { entity_type: &'static str },

    #[error("cannot delete '{entity_type}': it has not been committed")]
    DeleteUncommitted { entity_type: &'static str },

    #[error("'{entity_type}' with id {id} is already deleted")]
    AlreadyDeleted { entity_type: &'static str, id: i64 },

    #[error("row for '{entity_type}' has no id")]
    MissingIdentity { entity_type: &'static str },
}

///
/// CommitSummary
/// Counts of the writes a commit performed.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CommitSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,

    /// Updates without changes, and deletes the remote side had nothing for.
    pub skipped: usize,
}

impl CommitSummary {
    /// Writes sent to the engine.
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

///
/// PendingWrite
///

#[derive(Clone, Debug)]
struct PendingWrite {
    record: Record,
    kind: BatchRequestType,
}

type IdentityKey = (&'static str, i64);

///
/// Session
///
/// Unit of work bound to an engine and a schema.
///
/// Every persisted record the session sees is kept in an identity map, so
/// two queries returning the same remote entity hand out the same instance.
/// Writes are queued by `add` and `delete` and only reach the engine on
/// `commit`, in the order they were queued.
///

pub struct Session<'a> {
    engine: &'a dyn Engine,
    schema: &'a Schema,
    pending: Vec<PendingWrite>,
    identity: HashMap<IdentityKey, Record>,
    debug: bool,
    metrics: Option<&'a dyn MetricsSink>,
}

impl<'a> Session<'a> {
    #[must_use]
    pub fn new(engine: &'a dyn Engine, schema: &'a Schema) -> Self {
        Self {
            engine,
            schema,
            pending: Vec::new(),
            identity: HashMap::new(),
            debug: false,
            metrics: None,
        }
    }

    /// Log request payloads along with executed calls.
    #[must_use]
    pub const fn debug(mut self) -> Self {
        self.debug = true;
        self
    }

    #[must_use]
    pub const fn metrics_sink(mut self, sink: &'a dyn MetricsSink) -> Self {
        self.metrics = Some(sink);
        self
    }

    /// Run `f` in a fresh session: commit when it succeeds, roll back when
    /// it fails.
    pub fn scope<T>(
        engine: &'a dyn Engine,
        schema: &'a Schema,
        f: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut session = Self::new(engine, schema);

        match f(&mut session) {
            Ok(value) => {
                session.commit()?;
                Ok(value)
            }
            Err(err) => {
                session.rollback();
                Err(err)
            }
        }
    }

    #[must_use]
    pub const fn schema(&self) -> &'a Schema {
        self.schema
    }

    fn emit(&self, event: MetricsEvent) {
        sink::record(self.metrics, event);
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Execute a query and materialize its rows.
    pub fn exec<E: EntityKind>(&mut self, query: &Query<E>) -> Result<FindResult<E>, Error> {
        let data = query.data();
        let model = self.registered(data.model.entity_type)?;

        let rows = self.engine.find(data)?;
        if self.debug {
            tracing::debug!(entity_type = model.entity_type, rows = rows.len(), ?data, "find");
        } else {
            tracing::debug!(entity_type = model.entity_type, rows = rows.len(), "find");
        }
        self.emit(MetricsEvent::Find {
            entity_type: model.entity_type,
            rows: rows.len() as u64,
        });

        let entities = rows
            .iter()
            .map(|row| self.materialize(model, row, false).map(E::from_record))
            .collect::<Result<_, _>>()?;

        Ok(FindResult::new(entities))
    }

    /// Execute a summary query. Nothing is materialized or tracked.
    pub fn summarize<E: EntityKind>(&self, query: &SummarizeQuery<E>) -> Result<Summary, Error> {
        let data = query.data();
        let model = self.registered(data.model.entity_type)?;

        let summary = self.engine.summarize(data)?;
        if self.debug {
            tracing::debug!(entity_type = model.entity_type, ?data, "summarize");
        } else {
            tracing::debug!(
                entity_type = model.entity_type,
                groups = summary.groups.len(),
                "summarize"
            );
        }
        self.emit(MetricsEvent::Summarize {
            entity_type: model.entity_type,
        });

        Ok(summary)
    }

    /// Tracked instance of `E` with the given id.
    #[must_use]
    pub fn get<E: EntityKind>(&self, id: i64) -> Option<E> {
        self.identity
            .get(&(E::ENTITY_TYPE, id))
            .filter(|record| record.model() == E::MODEL)
            .map(|record| E::from_record(record.clone()))
    }

    /// Tracked record a relation value points at.
    #[must_use]
    pub fn resolve(&self, entity: &EntityRef) -> Option<Record> {
        self.lookup(entity).cloned()
    }

    fn lookup(&self, entity: &EntityRef) -> Option<&Record> {
        let model = self.schema.entity(&entity.entity_type)?;

        self.identity.get(&(model.entity_type, entity.id))
    }

    fn registered(&self, entity_type: &str) -> Result<&'static EntityModel, SessionError> {
        self.schema
            .entity(entity_type)
            .ok_or_else(|| SessionError::UnknownEntityType {
                entity_type: entity_type.to_string(),
            })
    }

    // Build (or refresh) the tracked record for one row. Nested rows are
    // keyed by each field's name in relation.
    fn materialize(
        &mut self,
        model: &'static EntityModel,
        row: &Row,
        nested: bool,
    ) -> Result<Record, Error> {
        let entity_type = model.entity_type;
        let id = row
            .get("id")
            .and_then(Json::as_i64)
            .ok_or(SessionError::MissingIdentity { entity_type })?;

        for (field, json) in row_fields(model, row, nested) {
            if field.kind.is_relation() {
                self.materialize_related(json)?;
            }
        }
        let values = decode_fields(model, row, nested)?;

        if let Some(existing) = self.identity.get(&(entity_type, id)) {
            existing.refresh(values);
            return Ok(existing.clone());
        }

        let record = Record::loaded(model, id, values);
        self.identity.insert((entity_type, id), record.clone());

        Ok(record)
    }

    // Relation values of registered types become tracked records too.
    fn materialize_related(&mut self, json: &Json) -> Result<(), Error> {
        let objects: Vec<&Row> = match json {
            Json::Object(object) => vec![object],
            Json::Array(items) => items.iter().filter_map(Json::as_object).collect(),
            _ => Vec::new(),
        };

        let schema = self.schema;
        for object in objects {
            let model = object
                .get("type")
                .and_then(Json::as_str)
                .and_then(|t| schema.entity(t));

            if let Some(model) = model {
                self.materialize(model, object, true)?;
            }
        }

        Ok(())
    }

    // ---------------------------------------------------------------------
    // Unit of work
    // ---------------------------------------------------------------------

    /// Queue a create (no identity yet) or an update (persisted instance).
    ///
    /// Adding an instance already queued returns the kind queued before.
    pub fn add(&mut self, entity: &impl AsRecord) -> Result<BatchRequestType, Error> {
        let record = entity.as_record();
        let entity_type = self.registered(record.entity_type())?.entity_type;

        if record.is_pending_delete() {
            return Err(SessionError::AddPendingDelete { entity_type }.into());
        }
        if record.is_deleted() {
            return Err(SessionError::AddDeleted { entity_type }.into());
        }
        if let Some(write) = self.pending_write(record) {
            return Ok(write.kind);
        }

        self.check_relations(record)?;

        let kind = if record.is_committed() {
            BatchRequestType::Update
        } else {
            BatchRequestType::Create
        };
        record.set_pending_add(kind == BatchRequestType::Create);
        self.track(record);
        self.pending.push(PendingWrite {
            record: record.clone(),
            kind,
        });

        Ok(kind)
    }

    /// Queue the deletion of a persisted instance.
    ///
    /// A create or update queued for the same instance is replaced.
    pub fn delete(&mut self, entity: &impl AsRecord) -> Result<(), Error> {
        let record = entity.as_record();
        let entity_type = self.registered(record.entity_type())?.entity_type;

        let Some(id) = record.id() else {
            return Err(SessionError::DeleteUncommitted { entity_type }.into());
        };
        if record.is_deleted() {
            return Err(SessionError::AlreadyDeleted { entity_type, id }.into());
        }

        record.set_pending_delete(true);
        self.track(record);

        match self
            .pending
            .iter_mut()
            .find(|w| w.record.same_instance(record))
        {
            Some(write) => write.kind = BatchRequestType::Delete,
            None => self.pending.push(PendingWrite {
                record: record.clone(),
                kind: BatchRequestType::Delete,
            }),
        }

        Ok(())
    }

    /// Whether the instance has a queued write.
    #[must_use]
    pub fn contains(&self, entity: &impl AsRecord) -> bool {
        self.pending_write(entity.as_record()).is_some()
    }

    /// Queued writes, in commit order.
    pub fn pending(&self) -> impl Iterator<Item = (BatchRequestType, &Record)> {
        self.pending.iter().map(|w| (w.kind, &w.record))
    }

    /// Requests a commit would send right now. Updates without changes are
    /// left out.
    pub fn pending_requests(&self) -> Result<Vec<BatchRequest>, Error> {
        let mut requests = Vec::with_capacity(self.pending.len());

        for write in &self.pending {
            let record = &write.record;
            let entity_type = record.entity_type();

            let request = match (write.kind, record.id()) {
                (BatchRequestType::Create, _) => {
                    BatchRequest::create(entity_type, encode_row(&record.available_values())?)
                }
                (BatchRequestType::Update, Some(id)) => {
                    let modified = record.modified_values();
                    if modified.is_empty() {
                        continue;
                    }
                    BatchRequest::update(entity_type, id, encode_row(&modified)?)
                }
                (BatchRequestType::Delete, Some(id)) => BatchRequest::delete(entity_type, id),
                (_, None) => return Err(SessionError::MissingIdentity { entity_type }.into()),
            };
            requests.push(request);
        }

        Ok(requests)
    }

    fn pending_write(&self, record: &Record) -> Option<&PendingWrite> {
        self.pending.iter().find(|w| w.record.same_instance(record))
    }

    fn track(&mut self, record: &Record) {
        if let Some(id) = record.id() {
            self.identity
                .entry((record.entity_type(), id))
                .or_insert_with(|| record.clone());
        }
    }

    // Related instances must be persisted and unmodified.
    fn check_relations(&self, record: &Record) -> Result<(), EntityError> {
        let values = record.available_values();
        let related = values
            .iter()
            .filter(|(field, _)| field.kind.is_relation())
            .flat_map(|(_, value)| value.entities())
            .filter_map(|entity| self.lookup(entity));

        for other in related {
            if other.is_modified() || other.is_pending_delete() || other.is_deleted() {
                return Err(EntityError::RelationshipNotCommitted {
                    entity_type: other.entity_type(),
                });
            }
        }

        Ok(())
    }

    /// Send every queued write, in order.
    ///
    /// Writes are sent one at a time. When one fails, the writes before it
    /// stay applied and leave the queue; the failing write and the ones
    /// after it stay queued.
    pub fn commit(&mut self) -> Result<CommitSummary, Error> {
        let mut summary = CommitSummary::default();
        let mut writes = std::mem::take(&mut self.pending).into_iter();

        while let Some(write) = writes.next() {
            if let Err(err) = self.execute(&write, &mut summary) {
                tracing::warn!(
                    entity_type = write.record.entity_type(),
                    kind = %write.kind,
                    completed = summary.writes(),
                    error = %err,
                    "commit interrupted"
                );
                self.pending = std::iter::once(write).chain(writes).collect();

                return Err(err);
            }
        }

        tracing::debug!(
            created = summary.created,
            updated = summary.updated,
            deleted = summary.deleted,
            skipped = summary.skipped,
            "commit"
        );
        self.emit(MetricsEvent::Commit {
            writes: summary.writes() as u64,
        });

        Ok(summary)
    }

    /// Drop every queued write.
    pub fn rollback(&mut self) {
        let writes = std::mem::take(&mut self.pending);

        for write in &writes {
            write.record.set_pending_add(false);
            write.record.set_pending_delete(false);
        }

        tracing::debug!(discarded = writes.len(), "rollback");
        self.emit(MetricsEvent::Rollback {
            writes: writes.len() as u64,
        });
    }

    fn execute(&mut self, write: &PendingWrite, summary: &mut CommitSummary) -> Result<(), Error> {
        let record = &write.record;
        let model = record.model();
        let entity_type = model.entity_type;
        let missing_id = || SessionError::MissingIdentity { entity_type };

        match write.kind {
            BatchRequestType::Create => {
                let data = encode_row(&record.available_values())?;
                self.log_write(write.kind, entity_type, None, &data);

                let row = self.engine.create(entity_type, data)?;
                let id = row.get("id").and_then(Json::as_i64).ok_or_else(missing_id)?;

                record.reconcile(Some(id), decode_fields(model, &row, false)?);
                record.set_pending_add(false);
                self.identity.insert((entity_type, id), record.clone());

                self.emit_write(WriteKind::Create, entity_type);
                summary.created += 1;
            }

            BatchRequestType::Update => {
                let id = record.id().ok_or_else(missing_id)?;
                let modified = record.modified_values();
                if modified.is_empty() {
                    summary.skipped += 1;
                    return Ok(());
                }

                let data = encode_row(&modified)?;
                self.log_write(write.kind, entity_type, Some(id), &data);

                let row = self.engine.update(entity_type, id, data)?;
                record.reconcile(None, decode_fields(model, &row, false)?);

                self.emit_write(WriteKind::Update, entity_type);
                summary.updated += 1;
            }

            BatchRequestType::Delete => {
                let id = record.id().ok_or_else(missing_id)?;
                self.log_write(write.kind, entity_type, Some(id), &Row::new());

                let deleted = self.engine.delete(entity_type, id)?;
                record.set_pending_delete(false);
                self.emit_write(WriteKind::Delete, entity_type);

                if deleted {
                    record.mark_deleted();
                    self.identity.remove(&(entity_type, id));
                    summary.deleted += 1;
                } else {
                    summary.skipped += 1;
                }
            }
        }

        Ok(())
    }

    fn emit_write(&self, kind: WriteKind, entity_type: &'static str) {
        self.emit(MetricsEvent::Write { kind, entity_type });
    }

    fn log_write(&self, kind: BatchRequestType, entity_type: &str, id: Option<i64>, data: &Row) {
        if self.debug {
            tracing::debug!(%kind, entity_type, ?id, ?data, "write");
        } else {
            tracing::debug!(%kind, entity_type, ?id, "write");
        }
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            tracing::warn!(
                pending = self.pending.len(),
                "session dropped with uncommitted writes"
            );
        }
    }
}

// Stored fields present in a row. Nested rows use names in relation.
fn row_fields<'r>(
    model: &'static EntityModel,
    row: &'r Row,
    nested: bool,
) -> impl Iterator<Item = (&'static FieldModel, &'r Json)> + 'r {
    row.iter().filter_map(move |(key, json)| {
        let field = if nested {
            model.field_by_relation_key(key)
        } else {
            model.field_by_name(key)
        }?;

        (!field.primary && !field.is_alias()).then_some((field, json))
    })
}

fn decode_fields(
    model: &'static EntityModel,
    row: &Row,
    nested: bool,
) -> Result<Vec<(&'static FieldModel, Value)>, ValueError> {
    row_fields(model, row, nested)
        .map(|(field, json)| Ok((field, from_wire(field.kind, json)?)))
        .collect()
}
