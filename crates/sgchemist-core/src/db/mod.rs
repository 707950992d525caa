//! Module: db
//! Responsibility: everything between typed entities and a remote service:
//! queries, records, wire shapes, engines and the session.
//! Does not own: entity declarations or schema validation.

pub mod engine;
pub mod query;
pub mod record;
pub mod response;
pub mod session;
pub mod wire;

// re-exports
pub use engine::{Engine, EngineError, MockEngine, ShotgunApiEngine, ShotgunClient};
pub use query::{Query, QueryError, SummarizeQuery, select, summarize};
pub use record::{EntityError, Record};
pub use response::{FindResult, ResponseError, Summary, SummaryGroup};
pub use session::{CommitSummary, Session, SessionError};
