use anyhow::Result;

use crate::config::MnemoConfig;
use crate::memory::types::{Caller, ListFilter};

/// List visible memories, newest first. An unset `limit` falls back to the
/// `[retrieval]` config section.
pub fn list(
    config: &MnemoConfig,
    caller: &Caller,
    page: usize,
    limit: Option<usize>,
    filter: &ListFilter,
) -> Result<()> {
    let limit = config.retrieval.resolve_limit(limit);

    let manager = super::open_manager(config)?;
    let records = manager.list(caller, page, limit, filter)?;

    if records.is_empty() {
        println!("No memories on page {page}.");
        return Ok(());
    }

    for record in &records {
        let tags = if record.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", record.tags.join(", "))
        };
        println!(
            "{}  {}  {}{}",
            record.created_at, record.privacy, record.content, tags
        );
        println!("    id: {}", record.id);
    }
    Ok(())
}
