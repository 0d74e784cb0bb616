//! Error types for the RAID health exporter

use std::time::Duration;

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while collecting or exporting controller health
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Parse Errors
    // =========================================================================
    /// A field the tool guarantees to be numeric held something else
    #[error("Malformed numeric value for '{field}': {token:?}")]
    MalformedNumber { field: String, token: String },

    /// smartctl produced no recognizable SMART sections
    #[error("No SMART data in output for device {device} (exit code {code:?})")]
    NotSmartOutput { device: String, code: Option<i32> },

    // =========================================================================
    // Command Errors
    // =========================================================================
    /// The external command could not be started
    #[error("Command '{command}' failed: {reason}")]
    CommandFailed { command: String, reason: String },

    /// The external command ran but exited unsuccessfully
    #[error("Command '{command}' exited with code {code:?}: {output}")]
    CommandExit {
        command: String,
        code: Option<i32>,
        output: String,
    },

    /// The external command did not finish in time
    #[error("Command '{command}' timed out after {timeout:?}")]
    CommandTimeout { command: String, timeout: Duration },

    // =========================================================================
    // Exposition Errors
    // =========================================================================
    /// Prometheus registry or encoding error
    #[error("Prometheus error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a `MalformedNumber` error for `field`
    pub fn malformed_number(field: impl Into<String>, token: impl Into<String>) -> Self {
        Error::MalformedNumber {
            field: field.into(),
            token: token.into(),
        }
    }

    /// True for errors raised by the parsers rather than by process invocation
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Error::MalformedNumber { .. } | Error::NotSmartOutput { .. }
        )
    }
}
