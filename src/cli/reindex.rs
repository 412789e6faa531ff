use anyhow::Result;

use crate::config::MnemoConfig;

/// Rebuild the vector index and position map from stored embeddings.
///
/// The recovery path for a lost or corrupt snapshot pair, and for records
/// left unindexed by a failed add.
pub fn reindex(config: &MnemoConfig) -> Result<()> {
    let manager = super::open_manager(config)?;
    let count = manager.reindex()?;
    println!("Reindexed {count} memories from stored embeddings.");
    Ok(())
}
