//! Error types for snapshot loading and queries.

use std::path::PathBuf;
use thiserror::Error;

/// Failures raised while reading the snapshot from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file was read but is not valid JSON. Never falls back.
    #[error("snapshot at {} is not valid JSON: {source}", .path.display())]
    CorruptData {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The file was read but is not UTF-8 text. Never falls back.
    #[error("snapshot at {} is not valid UTF-8: {source}", .path.display())]
    InvalidEncoding {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// The file parsed but the top-level value is not a list.
    #[error("snapshot at {} must be a JSON list, found {found}", .path.display())]
    InvalidShape { path: PathBuf, found: &'static str },

    /// Neither the primary nor the secondary location could be read.
    #[error("no snapshot available (last attempt {}): {source}", .path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Refreshing the secondary copy failed. Logged only, never returned.
    #[error("failed to refresh backup at {}: {source}", .path.display())]
    BackupWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures surfaced by the query operations.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl QueryError {
    pub fn not_found(message: impl Into<String>) -> Self {
        QueryError::NotFound(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        QueryError::InvalidInput(message.into())
    }
}

/// Short name of a JSON value's type, for shape errors.
pub fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "object",
    }
}
