use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::HashMap;

use crate::error::Result;
use crate::memory::store::MetadataStore;

/// Per-owner statistics for the `stats` operation.
#[derive(Debug, Serialize)]
pub struct MemoryStats {
    pub total_memories: u64,
    pub pinned_memories: u64,
    /// Records created in the trailing seven days.
    pub recent_memories_7d: u64,
    pub by_privacy: HashMap<String, u64>,
    pub by_source: HashMap<String, u64>,
    pub total_content_bytes: u64,
    pub avg_content_bytes: u64,
    /// Live entries in the vector index (all owners); filled in by the manager.
    pub index_entries: u64,
}

/// Compute statistics over one owner's records.
pub fn owner_stats(store: &MetadataStore, owner_id: &str) -> Result<MemoryStats> {
    store.with_conn(|conn| {
        let (total, pinned) = count_totals(conn, owner_id)?;
        let by_privacy = count_by_privacy(conn, owner_id)?;
        let by_source = count_by_source(conn, owner_id)?;
        let recent = count_recent(conn, owner_id)?;
        let total_content_bytes = content_bytes(conn, owner_id)?;

        Ok(MemoryStats {
            total_memories: total,
            pinned_memories: pinned,
            recent_memories_7d: recent,
            by_privacy,
            by_source,
            total_content_bytes,
            avg_content_bytes: total_content_bytes / total.max(1),
            index_entries: 0,
        })
    })
}

fn count_totals(conn: &Connection, owner_id: &str) -> Result<(u64, u64)> {
    let (total, pinned): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(pinned), 0) FROM memories WHERE owner_id = ?1",
        params![owner_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok((total as u64, pinned as u64))
}

fn count_by_privacy(conn: &Connection, owner_id: &str) -> Result<HashMap<String, u64>> {
    let mut map = HashMap::new();
    for level in &["private", "shared", "public"] {
        map.insert(level.to_string(), 0);
    }

    let mut stmt = conn.prepare(
        "SELECT privacy, COUNT(*) FROM memories WHERE owner_id = ?1 GROUP BY privacy",
    )?;
    let rows: Vec<(String, i64)> = stmt
        .query_map(params![owner_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for (level, count) in rows {
        map.insert(level, count as u64);
    }
    Ok(map)
}

fn count_by_source(conn: &Connection, owner_id: &str) -> Result<HashMap<String, u64>> {
    let mut stmt = conn.prepare(
        "SELECT COALESCE(source, 'unknown'), COUNT(*) FROM memories \
         WHERE owner_id = ?1 GROUP BY COALESCE(source, 'unknown')",
    )?;
    let rows: Vec<(String, i64)> = stmt
        .query_map(params![owner_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows.into_iter().map(|(s, c)| (s, c as u64)).collect())
}

fn count_recent(conn: &Connection, owner_id: &str) -> Result<u64> {
    let cutoff = (chrono::Utc::now() - chrono::Duration::days(7)).to_rfc3339();
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM memories WHERE owner_id = ?1 AND created_at >= ?2",
        params![owner_id, cutoff],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

fn content_bytes(conn: &Connection, owner_id: &str) -> Result<u64> {
    let bytes: i64 = conn.query_row(
        "SELECT COALESCE(SUM(LENGTH(CAST(content AS BLOB))), 0) FROM memories WHERE owner_id = ?1",
        params![owner_id],
        |row| row.get(0),
    )?;
    Ok(bytes as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::memory::types::{AddMemory, PrivacyLevel};

    fn test_store() -> MetadataStore {
        MetadataStore::new(db::open_memory_database().unwrap())
    }

    fn embedding(axis: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; 8];
        v[axis % 8] = 1.0;
        v
    }

    #[test]
    fn empty_owner_stats() {
        let store = test_store();
        let stats = owner_stats(&store, "alice").unwrap();
        assert_eq!(stats.total_memories, 0);
        assert_eq!(stats.recent_memories_7d, 0);
        assert_eq!(stats.by_privacy["private"], 0);
        assert_eq!(stats.total_content_bytes, 0);
        assert_eq!(stats.avg_content_bytes, 0);
    }

    #[test]
    fn stats_count_by_privacy_and_source() {
        let store = test_store();
        store
            .create("alice", &AddMemory::new("one").source("chat"), &embedding(0))
            .unwrap();
        store
            .create(
                "alice",
                &AddMemory::new("two").privacy(PrivacyLevel::Public).source("chat"),
                &embedding(1),
            )
            .unwrap();
        store
            .create("alice", &AddMemory::new("three"), &embedding(2))
            .unwrap();
        // Another owner's record must not leak into alice's stats.
        store
            .create("bob", &AddMemory::new("bob's"), &embedding(3))
            .unwrap();

        let stats = owner_stats(&store, "alice").unwrap();
        assert_eq!(stats.total_memories, 3);
        assert_eq!(stats.by_privacy["private"], 2);
        assert_eq!(stats.by_privacy["public"], 1);
        assert_eq!(stats.by_source["chat"], 2);
        assert_eq!(stats.by_source["unknown"], 1);
        assert_eq!(stats.recent_memories_7d, 3);
    }

    #[test]
    fn stats_content_sizes() {
        let store = test_store();
        store
            .create("alice", &AddMemory::new("abcd"), &embedding(0))
            .unwrap();
        store
            .create("alice", &AddMemory::new("efghijkl"), &embedding(1))
            .unwrap();

        let stats = owner_stats(&store, "alice").unwrap();
        assert_eq!(stats.total_content_bytes, 12);
        assert_eq!(stats.avg_content_bytes, 6);
    }

    #[test]
    fn stats_pinned_count() {
        let store = test_store();
        let record = store
            .create("alice", &AddMemory::new("keep me"), &embedding(0))
            .unwrap();
        store
            .apply_update(
                &record.id,
                &crate::memory::types::UpdateFields {
                    pinned: Some(true),
                    ..Default::default()
                },
                None,
            )
            .unwrap();

        let stats = owner_stats(&store, "alice").unwrap();
        assert_eq!(stats.pinned_memories, 1);
    }
}
