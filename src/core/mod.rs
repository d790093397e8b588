//! Core process foundations
//!
//! Error handling, configuration and logging shared by the binary and the library.

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used items
pub use config::{Config, StorageType};
pub use error::{Error, Result};
pub use logging::init_logging;
