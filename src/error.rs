//! Error types for the task store
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown task, missing link)
//! - 3: Store state (no store found, corrupt record)
//! - 4: Operation failed (I/O, serialization, write failure)

use std::path::PathBuf;
use thiserror::Error;

use crate::task::TaskId;

/// Exit codes for the task CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const STORE_STATE: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for store and graph operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Task store already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Task #{0} not found")]
    NotFound(TaskId),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No match: {0}")]
    NoMatch(String),

    // Store state (exit code 3)
    #[error("Not in a task repository (no .tasks/ directory found from {0})")]
    NotInitialized(PathBuf),

    #[error("Corrupt record {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Failed to write {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::AlreadyInitialized(_)
            | Error::NotFound(_)
            | Error::InvalidArgument(_)
            | Error::InvalidConfig(_)
            | Error::NoMatch(_) => exit_codes::USER_ERROR,

            // Store state
            Error::NotInitialized(_) | Error::Corrupt { .. } => exit_codes::STORE_STATE,

            // Operation failures
            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::WriteFailed { .. } => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured fields for JSON error output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::NotFound(id) => Some(serde_json::json!({ "id": id })),
            Error::NotInitialized(path) | Error::AlreadyInitialized(path) => {
                Some(serde_json::json!({ "path": path }))
            }
            Error::Corrupt { path, reason } | Error::WriteFailed { path, reason } => {
                Some(serde_json::json!({ "path": path, "reason": reason }))
            }
            Error::InvalidArgument(message)
            | Error::InvalidConfig(message)
            | Error::NoMatch(message) => Some(serde_json::json!({ "message": message })),
            _ => None,
        }
    }
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
