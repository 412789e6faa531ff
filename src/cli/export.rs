use anyhow::{Context, Result};
use std::path::Path;

use crate::config::MnemoConfig;
use crate::memory::types::{Caller, PrivacyLevel};

/// Export the caller's memories as JSON, to stdout or a file.
pub fn export(
    config: &MnemoConfig,
    caller: &Caller,
    privacy: Option<&[PrivacyLevel]>,
    output: Option<&Path>,
) -> Result<()> {
    let manager = super::open_manager(config)?;
    let payload = manager.export(caller, privacy)?;

    match output {
        Some(path) => {
            std::fs::write(path, &payload)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        None => println!("{payload}"),
    }
    Ok(())
}
