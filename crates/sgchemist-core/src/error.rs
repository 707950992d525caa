use crate::{
    db::{
        engine::EngineError, query::QueryError, record::EntityError, response::ResponseError,
        session::SessionError,
    },
    schema::SchemaError,
    value::ValueError,
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// Error
///
/// Any failure surfaced by the public API. Each layer keeps its own error
/// type; this wraps them so callers can `?` across layers and still match
/// on the original variant.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Entity(#[from] EntityError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Value(#[from] ValueError),
}

impl Error {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Schema(_) => ErrorClass::Configuration,
            Self::Query(_) => ErrorClass::Query,
            Self::Value(ValueError::NonFiniteFloat { .. })
            | Self::Entity(_)
            | Self::Session(_)
            | Self::Response(_) => ErrorClass::Consistency,
            Self::Engine(_) | Self::Value(_) => ErrorClass::Transport,
        }
    }
}

///
/// ErrorClass
/// Coarse classification for callers deciding how to react.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// Entity declarations are invalid.
    Configuration,

    /// A query or expression was built wrongly.
    Query,

    /// The engine or the data it returned failed.
    Transport,

    /// Instance or unit-of-work state forbids the operation.
    Consistency,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Configuration => "configuration",
            Self::Query => "query",
            Self::Transport => "transport",
            Self::Consistency => "consistency",
        };
        write!(f, "{label}")
    }
}
