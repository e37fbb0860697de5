//! Error types for Reprolab
//!
//! This module defines the error kinds produced by the summary resolver,
//! the job poller and the backend client, using `thiserror` for the
//! `Display` implementations.

use thiserror::Error;

/// Main error type for Reprolab operations
///
/// Callers receive these wrapped in `anyhow::Error` and can recover the
/// kind with `downcast_ref::<ReprolabError>()`.
#[derive(Error, Debug)]
pub enum ReprolabError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied an argument that cannot be used (empty client id, etc.)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A row that must exist was not returned by the backend
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend answered with a non-success HTTP status
    #[error("Backend returned {status}: {message}")]
    Backend {
        /// HTTP status code returned by the backend
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// Summary generator reported `success: false`
    #[error("Summary generation failed: {0}")]
    Generation(String),

    /// A watched job finished with status `failed`
    #[error("Job failed: {0}")]
    JobFailed(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ReprolabError {
    /// Returns true for the not-found kind
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReprolabError::NotFound(_))
    }
}

/// Result type alias for Reprolab operations
///
/// Uses `anyhow::Error` so that context can be attached while the
/// underlying `ReprolabError` stays recoverable by downcasting.
pub type Result<T> = anyhow::Result<T>;
