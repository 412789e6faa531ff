use anyhow::{Context, Result};
use std::path::Path;

use crate::config::MnemoConfig;
use crate::memory::types::Caller;

/// Import memories from a JSON export file, re-embedding each entry.
pub fn import(config: &MnemoConfig, caller: &Caller, input: &Path) -> Result<()> {
    let payload = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    let manager = super::open_manager(config)?;
    let imported = manager.import(caller, &payload)?;
    println!("Imported {} memories.", imported.len());
    Ok(())
}
