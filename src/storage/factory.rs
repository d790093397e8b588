//! Storage factory for creating the configured document store

use std::sync::Arc;

use crate::core::config::{StorageConfig, StorageType};
use crate::storage::{DocumentStore, MemStore, StoreResult};

/// Session factory shared by every request
pub type SharedStore = Arc<dyn DocumentStore>;

/// Create the store selected by configuration and check it answers.
///
/// Called once at startup; an unreachable backend stops the process here rather
/// than on the first request.
pub fn create_store(config: &StorageConfig) -> StoreResult<SharedStore> {
    let store: SharedStore = match config.storage_type {
        StorageType::Memory => Arc::new(MemStore::new()),
    };

    store.ping()?;
    tracing::info!("Document store ready: {:?}", config.storage_type);
    Ok(store)
}
