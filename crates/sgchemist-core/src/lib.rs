//! Core runtime for sgchemist: entity metamodel, values, expression and
//! query builders, engines, the unit-of-work session, and the ergonomics
//! exported via the `prelude`.

extern crate self as sgchemist_core;

#[macro_use]
mod macros;

// public exports are one module level down
pub mod db;
pub mod error;
pub mod fields;
pub mod model;
pub mod obs;
pub mod schema;
pub mod traits;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

#[doc(hidden)]
pub mod __reexports {
    pub use paste;
}

///
/// Prelude
///
/// Prelude contains the vocabulary needed to declare entities, build
/// queries and run a session. Engines and error internals stay in their
/// modules.
///

pub mod prelude {
    pub use crate::{
        db::{
            Session, Summary,
            query::{
                DateUnit, Field, OrderDirection, Predicate, Query, SummarizeQuery, select,
                summarize,
            },
            record::Record,
        },
        error::Error,
        model::entity::EntityModel,
        schema::Schema,
        traits::{AsRecord, EntityKind},
        value::{EntityRef, Value},
    };
}
