use anyhow::Result;

use crate::config::MnemoConfig;

/// Display memory statistics for one owner in the terminal.
pub fn stats(config: &MnemoConfig, owner: &str) -> Result<()> {
    let manager = super::open_manager(config)?;
    let stats = manager.stats(owner)?;

    println!("Memory Statistics — owner {owner}");
    println!("{}", "=".repeat(40));
    println!("  Total memories:      {}", stats.total_memories);
    println!("  Pinned:              {}", stats.pinned_memories);
    println!("  Created last 7 days: {}", stats.recent_memories_7d);
    println!();

    println!("By Privacy:");
    for level in &["private", "shared", "public"] {
        let count = stats.by_privacy.get(*level).copied().unwrap_or(0);
        println!("  {:<12} {}", level, count);
    }
    println!();

    if !stats.by_source.is_empty() {
        println!("By Source:");
        let mut sources: Vec<_> = stats.by_source.iter().collect();
        sources.sort();
        for (source, count) in sources {
            println!("  {:<12} {}", source, count);
        }
        println!();
    }

    println!("Content size:          {} bytes", stats.total_content_bytes);
    println!("Average record:        {} bytes", stats.avg_content_bytes);
    println!("Index entries:         {}", stats.index_entries);

    Ok(())
}
