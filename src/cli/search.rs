use anyhow::Result;

use crate::config::MnemoConfig;
use crate::memory::types::Caller;

/// Semantic search from the command line. Unset `k` and similarity floor
/// fall back to the `[retrieval]` config section.
pub fn search(
    config: &MnemoConfig,
    caller: &Caller,
    query: &str,
    k: Option<usize>,
    min_similarity: Option<f32>,
    group: Option<&str>,
) -> Result<()> {
    let k = config.retrieval.resolve_k(k);
    let min_similarity = config.retrieval.resolve_min_similarity(min_similarity);

    let manager = super::open_manager(config)?;
    let hits = manager.search(caller, query, k, None, group, min_similarity)?;

    if hits.is_empty() {
        println!("No matches.");
        return Ok(());
    }

    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "{:>2}. [{:.3}] {} ({}, {})",
            rank + 1,
            hit.similarity,
            preview(&hit.record.content, 80),
            hit.record.id,
            hit.record.privacy,
        );
    }
    Ok(())
}

fn preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}
