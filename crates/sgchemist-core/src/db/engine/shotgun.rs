use crate::db::{
    engine::{Engine, EngineError},
    query::{QueryData, SummarizeData},
    response::Summary,
    wire::{BatchRequest, BatchRequestType, BatchResult, FindRequest, Row, SummarizeRequest},
};
use serde_json::{Map, Value as Json};
use std::error::Error as StdError;

///
/// ShotgunClient
///
/// Transport to a ShotGrid site: one method per remote API call.
/// Authentication, connection handling and retries belong to the client.
///

pub trait ShotgunClient {
    type Error: StdError + Send + Sync + 'static;

    fn find(&self, request: &FindRequest) -> Result<Vec<Row>, Self::Error>;

    /// The raw `{"summaries", "groups"}` response.
    fn summarize(&self, request: &SummarizeRequest) -> Result<Json, Self::Error>;

    fn create(&self, entity_type: &str, data: &Row) -> Result<Row, Self::Error>;

    fn update(&self, entity_type: &str, id: i64, data: &Row) -> Result<Row, Self::Error>;

    fn delete(&self, entity_type: &str, id: i64) -> Result<bool, Self::Error>;

    /// One result per request: rows for creates and updates, booleans for deletes.
    fn batch(&self, requests: &[BatchRequest]) -> Result<Vec<Json>, Self::Error>;
}

///
/// ShotgunApiEngine
///
/// Engine translating queries into client calls.
///
/// Loaded related fields come back flattened as `relation.Type.field` keys;
/// they are moved under the relation value they belong to.
///

#[derive(Clone, Debug)]
pub struct ShotgunApiEngine<C> {
    client: C,
}

impl<C: ShotgunClient> ShotgunApiEngine<C> {
    pub const fn new(client: C) -> Self {
        Self { client }
    }

    pub const fn client(&self) -> &C {
        &self.client
    }
}

impl<C: ShotgunClient> Engine for ShotgunApiEngine<C> {
    fn find(&self, query: &QueryData) -> Result<Vec<Row>, EngineError> {
        let request = FindRequest::from_query(query)?;
        tracing::trace!(entity_type = %request.entity_type, fields = ?request.fields, "find");

        let rows = self.client.find(&request).map_err(EngineError::transport)?;

        Ok(rows.into_iter().map(nest_loaded_fields).collect())
    }

    fn summarize(&self, query: &SummarizeData) -> Result<Summary, EngineError> {
        let request = SummarizeRequest::from_query(query)?;
        tracing::trace!(entity_type = %request.entity_type, "summarize");

        let response = self
            .client
            .summarize(&request)
            .map_err(EngineError::transport)?;

        serde_json::from_value(response)
            .map_err(|e| EngineError::Response(format!("malformed summary: {e}")))
    }

    fn create(&self, entity_type: &str, data: Row) -> Result<Row, EngineError> {
        self.client
            .create(entity_type, &data)
            .map_err(EngineError::transport)
    }

    fn update(&self, entity_type: &str, id: i64, data: Row) -> Result<Row, EngineError> {
        self.client
            .update(entity_type, id, &data)
            .map_err(EngineError::transport)
    }

    fn delete(&self, entity_type: &str, id: i64) -> Result<bool, EngineError> {
        self.client
            .delete(entity_type, id)
            .map_err(EngineError::transport)
    }

    fn batch(&self, requests: &[BatchRequest]) -> Result<Vec<BatchResult>, EngineError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let results = self.client.batch(requests).map_err(EngineError::transport)?;
        if results.len() != requests.len() {
            return Err(EngineError::Response(format!(
                "batch returned {} results for {} requests",
                results.len(),
                requests.len()
            )));
        }

        requests
            .iter()
            .zip(results)
            .map(|(request, result)| batch_result(request.request_type, result))
            .collect()
    }
}

fn batch_result(request_type: BatchRequestType, result: Json) -> Result<BatchResult, EngineError> {
    match (request_type, result) {
        (BatchRequestType::Delete, Json::Bool(deleted)) => Ok(BatchResult::Deleted(deleted)),
        (BatchRequestType::Create | BatchRequestType::Update, Json::Object(row)) => {
            Ok(BatchResult::Row(row))
        }
        (request_type, other) => Err(EngineError::Response(format!(
            "unexpected {request_type} result: {other}"
        ))),
    }
}

/// Move `relation.Type.field` keys into the relation value they describe.
///
/// Keys whose relation value is missing, null, or of another entity type
/// are dropped.
pub(crate) fn nest_loaded_fields(row: Row) -> Row {
    let mut out = Map::new();
    let mut loaded = Vec::new();

    for (key, value) in row {
        if split_loaded_key(&key).is_some() {
            loaded.push((key, value));
        } else {
            out.insert(key, value);
        }
    }

    for (key, value) in loaded {
        let Some((column, target, leaf)) = split_loaded_key(&key) else {
            continue;
        };
        let Some(Json::Object(relation)) = out.get_mut(column) else {
            continue;
        };
        if relation.get("type").and_then(Json::as_str) == Some(target) {
            relation.insert(leaf.to_string(), value);
        }
    }

    out
}

fn split_loaded_key(key: &str) -> Option<(&str, &str, &str)> {
    let mut parts = key.splitn(3, '.');

    match (parts.next(), parts.next(), parts.next()) {
        (Some(column), Some(target), Some(leaf)) => Some((column, target, leaf)),
        _ => None,
    }
}
