//! Error types for the `uplift` core library.

use thiserror::Error;

/// Result type alias using the core [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `uplift` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Session identifier failed validation
    #[error("Invalid session identifier: {0:?}")]
    InvalidSessionId(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
