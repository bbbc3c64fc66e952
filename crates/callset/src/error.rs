//! Error types for schema parsing and dataset generation.
//!
//! The HTTP layer reports plain `String` errors so [`crate::api::retry`] can
//! classify them; they are wrapped here once a call has given up.

use std::path::PathBuf;
use thiserror::Error;

/// A tool's `parameters` block does not have the shape the enumerator supports.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("parameters must be a JSON object")]
    NotAnObject,
    #[error("`properties` must be a JSON object")]
    PropertiesNotObject,
    #[error("`required` must be an array of field names")]
    InvalidRequired,
    #[error("required field `{0}` is not declared in `properties`")]
    UnknownRequired(String),
    #[error("required field `{0}` is listed more than once")]
    DuplicateRequired(String),
}

/// Anything that can abort a generation run.
#[derive(Debug, Error)]
pub enum GenError {
    #[error("failed to read catalog {path}: {source}")]
    CatalogIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    CatalogParse(#[source] serde_json::Error),

    #[error("duplicate tool `{0}` in catalog")]
    DuplicateTool(String),

    #[error("tool `{tool}` has an unsupported parameter schema: {source}")]
    Schema {
        tool: String,
        #[source]
        source: SchemaError,
    },

    #[error("completion failed for `{tool}`: {message}")]
    Completion { tool: String, message: String },

    #[error("model returned no content for `{tool}`")]
    EmptyResponse { tool: String },

    #[error("model returned malformed invocation JSON for `{tool}`: {source} (content: {content})")]
    InvalidFill {
        tool: String,
        content: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("model returned a malformed prompt list for `{tool}`: {source} (content: {content})")]
    InvalidPrompts {
        tool: String,
        content: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize dataset: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to write dataset: {0}")]
    Output(#[from] std::io::Error),
}
