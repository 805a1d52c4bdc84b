//! Error types for minthub.

use thiserror::Error;

/// Result type alias using minthub's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for minthub operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error). Fatal for the
    /// calling operation; never subject to job-level retry.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Malformed request to the store or a handler payload.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Monetary amount failed to parse as a positive integer.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Job kind has no registered handler. Always terminal.
    #[error("Unsupported transaction type: {0}")]
    UnsupportedType(String),

    /// Chain submission failed for reasons plausibly resolved by
    /// waiting (network blip, node unavailability).
    #[error("Chain request failed: {0}")]
    Chain(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Chain(e.to_string())
    }
}
