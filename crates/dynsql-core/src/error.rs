use std::fmt;
use thiserror::Error as ThisError;

///
/// QueryError
///
/// Every failure the compiler can surface. Compilation is a pure function of
/// its inputs, so none of these are retried internally.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum QueryError {
    #[error("model [{model}] field [{field}]: {message}")]
    FieldParameter {
        model: String,
        field: String,
        message: String,
    },

    #[error("condition parameter error: {0}")]
    ConditionParameter(String),

    #[error("unsupported operation for dialect [{dialect}]: {message}")]
    UnsupportedOperation { dialect: String, message: String },

    #[error("model [{model}] join field [{field}]: {message}")]
    JoinField {
        model: String,
        field: String,
        message: String,
    },

    #[error("model [{model}] field [{field}] references unregistered model [{target}]")]
    Join {
        model: String,
        field: String,
        target: String,
    },

    #[error("model [{model}] has no self-referencing relationship field")]
    RecursiveField { model: String },

    #[error("unknown model [{0}]")]
    UnknownModel(String),

    #[error("config error: {0}")]
    Config(String),
}

impl QueryError {
    pub(crate) fn field(
        model: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::FieldParameter {
            model: model.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn join_field(
        model: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::JoinField {
            model: model.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn condition(message: impl Into<String>) -> Self {
        Self::ConditionParameter(message.into())
    }

    pub(crate) fn unsupported(dialect: impl fmt::Display, message: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            dialect: dialect.to_string(),
            message: message.into(),
        }
    }

    /// Stable classification used by the public error surface.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::FieldParameter { .. }
            | Self::ConditionParameter(_)
            | Self::JoinField { .. }
            | Self::Join { .. }
            | Self::RecursiveField { .. }
            | Self::UnknownModel(_) => ErrorClass::Caller,
            Self::UnsupportedOperation { .. } => ErrorClass::Unsupported,
            Self::Config(_) => ErrorClass::Config,
        }
    }

    /// Compiler stage the error was raised from.
    #[must_use]
    pub const fn origin(&self) -> ErrorOrigin {
        match self {
            Self::ConditionParameter(_) | Self::UnsupportedOperation { .. } => {
                ErrorOrigin::Condition
            }
            Self::FieldParameter { .. }
            | Self::JoinField { .. }
            | Self::Join { .. }
            | Self::UnknownModel(_) => ErrorOrigin::JoinGraph,
            Self::RecursiveField { .. } => ErrorOrigin::Recursive,
            Self::Config(_) => ErrorOrigin::Config,
        }
    }
}

///
/// ErrorClass
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// The caller supplied something the compiler cannot accept.
    Caller,
    /// The request is valid but the dialect cannot express it.
    Unsupported,
    Config,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Caller => "caller",
            Self::Unsupported => "unsupported",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Condition,
    Config,
    JoinGraph,
    Recursive,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Condition => "condition",
            Self::Config => "config",
            Self::JoinGraph => "join_graph",
            Self::Recursive => "recursive",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
