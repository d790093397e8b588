//! Doc Gateway - a REST gateway over a schemaless document store
//!
//! Maps `GET`/`POST`/`PUT`/`DELETE` on `/{db}/{collection}/{docid}` style paths onto
//! document store operations, with JSON in and JSON out.
#![warn(missing_docs)]

// Configure global allocator
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

// Core foundational modules
pub mod core;
pub mod types;

// Main functional modules
pub mod storage;
pub mod api;

// Re-export commonly used items for convenience
pub use crate::core::{Config, Error, Result};
pub use crate::types::{Document, DocumentId};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
