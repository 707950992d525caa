//! ## Crate layout
//! - `core`: entity metamodel, values, queries, engines, the session and
//!   observability.
//! - `entity!`: declares entity types over the core metamodel.
//!
//! The `prelude` module carries what application code needs to declare
//! entities, build queries and run a session.

pub use sgchemist_core as core;

/// Engine rows are `serde_json` maps; re-exported so callers can build them
/// without a direct dependency.
pub use serde_json;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//
// Macros
//

pub use crate::core::{entity, error::Error};

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::{
        db::{
            CommitSummary, Engine as _, FindResult, MockEngine, Session, ShotgunApiEngine,
            ShotgunClient, Summary, SummaryGroup,
            query::{
                DateUnit, Field, OrderDirection, Predicate, Query, SummarizeQuery, select,
                summarize,
            },
            record::Record,
            wire::Row,
        },
        error::{Error, ErrorClass},
        schema::Schema,
        traits::{AsRecord, EntityKind},
        value::{EntityRef, Value},
    };
    pub use serde_json::json;
}
