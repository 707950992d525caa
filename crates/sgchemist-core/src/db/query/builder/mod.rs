//! Module: query::builder
//! Responsibility: typed field descriptors and field paths.
//! Does not own: predicate evaluation or wire encoding.
//! Boundary: user-facing ergonomic builder layer.

mod field;

#[cfg(test)]
mod tests;

pub use field::{Field, FieldPath, Hop};
