//! Error types for rust-schematic

use std::path::PathBuf;
use thiserror::Error;

/// Error raised by a schema layer implementation.
///
/// Layers wrap whatever their backing store produces (I/O, query, decode
/// failures). Absence of an object is `Ok(None)`, never a `LayerError`.
pub type LayerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while building identifiers, resolving layered
/// schemas or compiling SQL expressions
#[derive(Error, Debug)]
pub enum SchematicError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("Expression references parameters with no bound value: {}", names.join(", "))]
    UnboundReference { names: Vec<String> },

    #[error("Parameter '{name}' holds a {kind} value, which cannot be rendered as a variable")]
    UnsupportedValue { name: String, kind: &'static str },

    #[error("Schema layer '{layer}' failed")]
    LayerFailure {
        layer: String,
        #[source]
        source: LayerError,
    },

    #[error("Failed to read snapshot file: {path}")]
    SnapshotReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse snapshot file: {path}")]
    SnapshotParseError {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("Invalid snapshot file {path}: {message}")]
    InvalidSnapshotFormat { path: PathBuf, message: String },

    #[error("Failed to write snapshot: {message}")]
    SnapshotWriteError { message: String },
}

impl SchematicError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        SchematicError::InvalidArgument {
            message: message.into(),
        }
    }
}

impl From<quick_xml::Error> for SchematicError {
    fn from(err: quick_xml::Error) -> Self {
        SchematicError::SnapshotWriteError {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for SchematicError {
    fn from(err: std::io::Error) -> Self {
        SchematicError::SnapshotWriteError {
            message: err.to_string(),
        }
    }
}

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, SchematicError>;
