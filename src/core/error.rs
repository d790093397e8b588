//! Error types for gateway startup and configuration
//!
//! Request-level failures live in [`crate::api::ApiError`]; this module covers
//! everything that can stop the process from coming up or shutting down cleanly.

use thiserror::Error;

use crate::api::routes::RouteError;
use crate::storage::StoreError;

/// Main result type used by startup code
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the gateway process
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Document store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Route table construction errors
    #[error("Route error: {0}")]
    Route(#[from] RouteError),

    /// HTTP server failures
    #[error("Server error: {0}")]
    Server(String),

    /// I/O errors from std
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a server error
    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }
}
