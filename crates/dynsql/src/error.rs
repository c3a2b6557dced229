use derive_more::Display;
use dynsql_core::error::{ErrorOrigin as CoreErrorOrigin, QueryError};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        let kind = match &err {
            QueryError::FieldParameter { .. } | QueryError::UnknownModel(_) => {
                ErrorKind::Compile(CompileErrorKind::InvalidField)
            }
            QueryError::ConditionParameter(_) => {
                ErrorKind::Compile(CompileErrorKind::InvalidCondition)
            }
            QueryError::JoinField { .. } | QueryError::Join { .. } => {
                ErrorKind::Compile(CompileErrorKind::InvalidJoin)
            }
            QueryError::RecursiveField { .. } => {
                ErrorKind::Compile(CompileErrorKind::NotHierarchical)
            }
            QueryError::UnsupportedOperation { .. } => {
                ErrorKind::Compile(CompileErrorKind::Unsupported)
            }
            QueryError::Config(_) => ErrorKind::Config,
        };

        Self::new(kind, err.origin().into(), err.to_string())
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    Compile(CompileErrorKind),

    /// Engine settings could not be read.
    Config,
}

///
/// CompileErrorKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum CompileErrorKind {
    /// Unknown, unpermitted or malformed field path.
    InvalidField,

    /// Condition value or shape cannot be rendered.
    InvalidCondition,

    /// Relationship metadata cannot produce a join.
    InvalidJoin,

    /// Recursive request over a model without a self-reference.
    NotHierarchical,

    /// The dialect has no syntax for the requested feature.
    Unsupported,
}

///
/// ErrorOrigin
/// Compiler stage that raised the error.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Condition,
    Config,
    JoinGraph,
    Recursive,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Condition => Self::Condition,
            CoreErrorOrigin::Config => Self::Config,
            CoreErrorOrigin::JoinGraph => Self::JoinGraph,
            CoreErrorOrigin::Recursive => Self::Recursive,
        }
    }
}
