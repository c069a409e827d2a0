//! Common error types for reshuffle

use thiserror::Error;

/// Common result type for reshuffle operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the reshuffle crates
#[derive(Error, Debug)]
pub enum Error {
    /// Cache storage error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Cached or remote payload could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Transport-level failure talking to the remote collection service
    #[error("Remote error: {0}")]
    Remote(String),

    /// Remote collection service answered with a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),
}
