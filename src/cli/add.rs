use anyhow::Result;

use crate::config::MnemoConfig;
use crate::memory::types::{AddMemory, Caller, PrivacyLevel};

/// Store a new memory from the command line.
#[allow(clippy::too_many_arguments)]
pub fn add(
    config: &MnemoConfig,
    caller: &Caller,
    content: &str,
    privacy: PrivacyLevel,
    tags: &[String],
    source: Option<&str>,
    group: Option<&str>,
) -> Result<()> {
    let manager = super::open_manager(config)?;

    let mut draft = AddMemory::new(content)
        .privacy(privacy)
        .tags(tags.to_vec());
    if let Some(source) = source {
        draft = draft.source(source);
    }
    if let Some(group) = group {
        draft = draft.group(group);
    }

    let record = manager.add(caller, draft)?;
    println!("Stored memory {} ({})", record.id, record.privacy);
    Ok(())
}
