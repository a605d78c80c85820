//! Common error types for kinmatch
//!
//! Only `Config` and `InvalidInput` are hard failures for a match operation.
//! Provider and generative failures are handled inside the resolver and never
//! reach this type.

use thiserror::Error;

/// Common result type for kinmatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across kinmatch crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or malformed required input (e.g. a subject with no name)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
