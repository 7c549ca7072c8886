//! Error types for Quarry
//!
//! Every failure a builder verb can detect has its own variant. The builder
//! keeps the most recent one in a sticky slot, so the type is cheap to clone
//! and compare.

use thiserror::Error;

/// The main error type for Quarry operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A required argument was empty
    #[error("Empty {argument} in {context}")]
    EmptyInput {
        argument: &'static str,
        context: &'static str,
    },

    /// An argument had the wrong shape
    #[error("Incorrect type of {argument} in {context}. {argument} must be {expected}")]
    InvalidType {
        argument: &'static str,
        context: &'static str,
        expected: &'static str,
    },

    /// The requested join type is not legal for the active dialect
    #[error("{join_type} JOIN is not allowed in {dialect}")]
    IllegalJoinType { join_type: String, dialect: String },

    /// A SELECT statement was required but the statement holds none
    #[error("No SELECT found in {context}")]
    MissingSelect { context: &'static str },

    /// A second EXCEPT or INTERSECT section was requested
    #[error("SQL has already {operator}")]
    DuplicateSetOp { operator: &'static str },

    /// A condition used an operator outside the supported set
    #[error("Unknown operator '{token}'")]
    UnknownOperator { token: String },

    /// The execution port reported a failure
    #[error("Error executing query: {message}")]
    Execution { message: String },

    /// Connection configuration could not be used
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A message recorded by the caller through `set_error`
    #[error("{message}")]
    Custom { message: String },
}

/// Convenience Result type for Quarry operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new empty input error
    pub fn empty_input(argument: &'static str, context: &'static str) -> Self {
        Self::EmptyInput { argument, context }
    }

    /// Create a new invalid type error
    pub fn invalid_type(
        argument: &'static str,
        context: &'static str,
        expected: &'static str,
    ) -> Self {
        Self::InvalidType {
            argument,
            context,
            expected,
        }
    }

    /// Create a new missing SELECT error
    pub fn missing_select(context: &'static str) -> Self {
        Self::MissingSelect { context }
    }

    /// Create a new execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an error carrying a caller-supplied message
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom {
            message: message.into(),
        }
    }

    /// Whether the error came from the execution port rather than from
    /// statement compilation
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::execution(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::execution(format!("row decoding failed: {err}"))
    }
}
