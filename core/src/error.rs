//! Error types for schema building, merging, and reconstruction.

use thiserror::Error;

use crate::ValidationError;

/// Errors raised while building a schema tree from a record type.
///
/// These surface before anything is registered with a flag-parsing engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// An attribute is a container (list/optional) of nested records.
    #[error(
        "attribute '{attribute}' of '{record}' is a container of nested records, which is not supported"
    )]
    UnsupportedSchema { record: String, attribute: String },

    /// A record type contains itself, directly or through other records.
    #[error("record '{record}' recursively contains itself: {path}")]
    RecursiveRecord { record: String, path: String },

    /// Nesting exceeds [`MAX_NESTING_DEPTH`](crate::MAX_NESTING_DEPTH).
    #[error("record nesting exceeds {max} levels at '{path}'")]
    TooDeep { path: String, max: usize },

    /// A record type failed structural validation.
    #[error("invalid record '{record}': {source}")]
    InvalidRecord {
        record: String,
        #[source]
        source: ValidationError,
    },
}

/// Errors raised while constructing record instances from parsed values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    /// A constructor parameter without a default was not supplied.
    #[error("missing required parameter '{parameter}' for '{record}'")]
    MissingParameter { record: String, parameter: String },

    /// A value was supplied for a name that is not a constructor parameter.
    #[error("unexpected parameter '{parameter}' for '{record}'")]
    UnexpectedParameter { record: String, parameter: String },

    /// A supplied value does not satisfy the parameter's declared type.
    #[error("parameter '{parameter}' of '{record}' expects {expected}, got {found}")]
    TypeMismatch {
        record: String,
        parameter: String,
        expected: String,
        found: String,
    },

    /// A repeated field received neither one value nor one per repetition.
    #[error(
        "the field '{field}' contains {found} values, but either 1 or {expected} values were expected"
    )]
    InconsistentArguments {
        field: String,
        found: usize,
        expected: usize,
    },
}

/// Two schema trees that were asked to merge do not have the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot merge schema trees: node {position} is {found}, expected {expected}")]
pub struct ShapeMismatchError {
    /// Preorder position of the first mismatching node.
    pub position: usize,
    /// Shape of the node being merged into.
    pub expected: String,
    /// Shape of the node being merged.
    pub found: String,
}

/// A raw command-line string could not be coerced to a field's type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CoercionError {
    pub message: String,
}

impl CoercionError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
