use anyhow::Result;

use crate::config::MnemoConfig;
use crate::memory::types::Caller;

/// Permanently delete a memory by id.
pub fn forget(config: &MnemoConfig, caller: &Caller, id: &str) -> Result<()> {
    let manager = super::open_manager(config)?;
    manager.delete(caller, id)?;
    println!("Deleted memory {id}");
    Ok(())
}
