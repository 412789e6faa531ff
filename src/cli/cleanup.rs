use anyhow::Result;

use crate::config::MnemoConfig;

/// Delete unpinned memories older than the given age.
pub fn cleanup(config: &MnemoConfig, days: i64) -> Result<()> {
    let manager = super::open_manager(config)?;
    let removed = manager.cleanup(days)?;
    println!("Removed {removed} unpinned memories older than {days} days.");
    Ok(())
}
