use thiserror::Error;

/// Malformed query text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at position {position}")]
pub struct SyntaxError {
    pub message: String,
    /// Byte offset into the query text
    pub position: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

/// A conjunction whose patterns cannot be separated from its parameters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot evaluate: unable to partition pure search pattern in {node}")]
pub struct PartitionError {
    /// Structural rendering of the offending node
    pub node: String,
}

/// A well-formed query that asks for something invalid
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("field \"{field}\" may only appear once")]
    Duplicate { field: String },

    #[error("field \"{field}\" does not support negation")]
    NotNegatable { field: String },

    #[error("invalid value \"{value}\" for field \"{field}\": {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("field \"{field}\" requires {requires}")]
    MissingCompanion { field: String, requires: String },

    #[error("field \"{field}\" conflicts with {other}")]
    Conflict { field: String, other: String },

    #[error("invalid regular expression \"{pattern}\": {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl ValidationError {
    /// The field the error is about, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::Duplicate { field }
            | ValidationError::NotNegatable { field }
            | ValidationError::InvalidValue { field, .. }
            | ValidationError::MissingCompanion { field, .. }
            | ValidationError::Conflict { field, .. } => Some(field.as_str()),
            ValidationError::InvalidPattern { .. } => None,
        }
    }
}

/// Any error raised while compiling query text into a plan
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Partition(#[from] PartitionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
