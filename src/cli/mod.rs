pub mod add;
pub mod cleanup;
pub mod export;
pub mod forget;
pub mod import;
pub mod list;
pub mod reindex;
pub mod search;
pub mod stats;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::MnemoConfig;
use crate::memory::manager::MemoryManager;
use crate::memory::store::MetadataStore;

/// Construct the memory manager from configuration: embedding provider,
/// metadata store, and snapshot pair. The single composition point — the
/// manager is passed by reference to whatever consumes it.
pub fn open_manager(config: &MnemoConfig) -> Result<MemoryManager> {
    let provider = crate::embedding::create_provider(&config.embedding)?;
    let conn = crate::db::open_database(config.resolved_db_path())?;
    let store = MetadataStore::new(conn);

    MemoryManager::new(
        Arc::from(provider),
        store,
        config.resolved_snapshot_base(),
    )
    .context("failed to initialize memory manager")
}
