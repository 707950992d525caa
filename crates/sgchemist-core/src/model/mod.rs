//! Runtime metamodel definitions.
//!
//! Types in `model` are the static descriptions `entity!` declarations
//! produce. Queries, records, engines and the session read them; nothing
//! mutates them.
//!
//! In general:
//! - `entity!` declarations define *what exists*
//! - `model` defines *what the rest of the crate reads*
pub mod entity;
pub mod field;
