//! Error types for argument parsing.

use schema_args_core::{ConstructionError, SchemaError, ShapeMismatchError};
use thiserror::Error;

/// Errors that can occur while declaring or parsing arguments.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A record type could not be turned into a schema tree.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Parsed values could not be assembled into record instances.
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    /// Two trees of the same record type could not be merged.
    #[error(transparent)]
    ShapeMismatch(#[from] ShapeMismatchError),

    /// Command-line parsing failed (also covers `--help`).
    #[error(transparent)]
    Clap(#[from] clap::Error),

    /// Two fields map to the same option string.
    #[error("conflicting option string '{option}' for '{first}' and '{second}'")]
    Conflict {
        option: String,
        first: String,
        second: String,
    },

    /// A destination was registered twice.
    #[error("destination '{0}' is already in use")]
    DuplicateDestination(String),

    /// No instance was parsed for the requested destination.
    #[error("no parsed instance at destination '{0}'")]
    MissingDestination(String),

    /// A parsed instance could not be converted to the requested type.
    #[error("cannot deserialize '{dest}': {source}")]
    Deserialize {
        dest: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience alias for results with [`ParseError`].
pub type Result<T> = std::result::Result<T, ParseError>;
