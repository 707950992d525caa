//! Module: engine
//! Responsibility: execution boundary between queries/writes and a remote service.
//! Does not own: entity materialization or unit-of-work bookkeeping.
//! Boundary: everything crossing it is plain rows keyed by remote field name.

mod mock;
mod shotgun;


use crate::{
    db::{
        query::{QueryData, SummarizeData},
        response::Summary,
        wire::{BatchRequest, BatchRequestType, BatchResult, Row},
    },
    value::ValueError,
};
use std::error::Error as StdError;
use thiserror::Error as ThisError;

// re-exports
pub use mock::MockEngine;
pub use shotgun::{ShotgunApiEngine, ShotgunClient};

///
/// EngineError
///
/// Failures of an engine call. Transport failures are carried unchanged as
/// the error source.
///

#[derive(Debug, ThisError)]
pub enum EngineError {
    #[error(transparent)]
    Transport(Box<dyn StdError + Send + Sync>),

    #[error("entity type '{0}' is not registered")]
    UnknownEntity(String),

    #[error("entity type '{entity_type}' has no field '{field}'")]
    UnknownField { entity_type: String, field: String },

    #[error("'{entity_type}' with id {id} does not exist")]
    NotFound { entity_type: String, id: i64 },

    #[error("invalid batch request: {0}")]
    InvalidRequest(String),

    #[error("unexpected response: {0}")]
    Response(String),

    #[error(transparent)]
    Value(#[from] ValueError),
}

impl EngineError {
    /// Wrap a transport-level failure.
    pub fn transport(err: impl StdError + Send + Sync + 'static) -> Self {
        Self::Transport(Box::new(err))
    }
}

///
/// Engine
///
/// Executes queries and writes against a remote service.
///
/// Rows are keyed by remote field name; relation values are
/// `{"type", "id"}` objects, possibly carrying loaded related fields.
///

pub trait Engine {
    /// Rows matching the query, projected to its fields.
    fn find(&self, query: &QueryData) -> Result<Vec<Row>, EngineError>;

    /// Aggregates over the rows matching the query.
    fn summarize(&self, query: &SummarizeData) -> Result<Summary, EngineError>;

    /// Create a record; the returned row carries the new `id`.
    fn create(&self, entity_type: &str, data: Row) -> Result<Row, EngineError>;

    /// Update a record; the returned row carries the written values.
    fn update(&self, entity_type: &str, id: i64, data: Row) -> Result<Row, EngineError>;

    /// Delete (retire) a record. `false` when nothing was deleted.
    fn delete(&self, entity_type: &str, id: i64) -> Result<bool, EngineError>;

    /// Execute several writes. The default dispatches one call per request,
    /// in order, and stops at the first failure.
    fn batch(&self, requests: &[BatchRequest]) -> Result<Vec<BatchResult>, EngineError> {
        requests.iter().map(|request| dispatch(self, request)).collect()
    }
}

fn dispatch<E: Engine + ?Sized>(
    engine: &E,
    request: &BatchRequest,
) -> Result<BatchResult, EngineError> {
    let entity_type = request.entity_type.as_str();
    let missing = |what: &str| {
        EngineError::InvalidRequest(format!(
            "{} request on '{entity_type}' without {what}",
            request.request_type
        ))
    };

    match request.request_type {
        BatchRequestType::Create => {
            let data = request.data.clone().ok_or_else(|| missing("data"))?;
            engine.create(entity_type, data).map(BatchResult::Row)
        }
        BatchRequestType::Update => {
            let id = request.entity_id.ok_or_else(|| missing("entity_id"))?;
            let data = request.data.clone().ok_or_else(|| missing("data"))?;
            engine.update(entity_type, id, data).map(BatchResult::Row)
        }
        BatchRequestType::Delete => {
            let id = request.entity_id.ok_or_else(|| missing("entity_id"))?;
            engine.delete(entity_type, id).map(BatchResult::Deleted)
        }
    }
}
