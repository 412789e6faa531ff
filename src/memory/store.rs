//! Metadata record store backed by SQLite.
//!
//! The store is its own system of record: it assigns ids, persists every
//! field of a [`MemoryRecord`] including the redundant embedding blob, and
//! answers filtered, paginated list queries. It is **not** transactionally
//! joined with the vector index — the manager maintains consistency through
//! operation ordering.

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Mutex, MutexGuard};

use crate::error::{MemoryError, Result};
use crate::memory::types::{AddMemory, Caller, ListFilter, MemoryRecord, UpdateFields};
use crate::memory::{bytes_to_embedding, embedding_to_bytes};

const RECORD_COLUMNS: &str = "id, owner_id, group_id, content, embedding, metadata, source, \
     privacy, tags, pinned, access_count, created_at, last_accessed";

/// Durable relational store for memory records.
pub struct MetadataStore {
    conn: Mutex<Connection>,
}

impl MetadataStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A poisoned lock only means another thread panicked mid-query; the
        // connection itself is still usable.
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Insert a new record, assigning a UUID v7 id and creation timestamp.
    pub fn create(
        &self,
        owner_id: &str,
        draft: &AddMemory,
        embedding: &[f32],
    ) -> Result<MemoryRecord> {
        let id = uuid::Uuid::now_v7().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let tags_json = serde_json::to_string(&draft.tags)
            .map_err(|e| MemoryError::Decode(format!("tags encode: {e}")))?;
        let metadata_json = draft
            .metadata
            .as_ref()
            .map(|m| m.to_string());

        let conn = self.conn();
        conn.execute(
            "INSERT INTO memories \
             (id, owner_id, group_id, content, embedding, metadata, source, privacy, tags, \
              pinned, access_count, created_at, last_accessed) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, 0, ?10, NULL)",
            params![
                id,
                owner_id,
                draft.group_id,
                draft.content,
                embedding_to_bytes(embedding),
                metadata_json,
                draft.source,
                draft.privacy.as_str(),
                tags_json,
                now,
            ],
        )?;

        Ok(MemoryRecord {
            id,
            owner_id: owner_id.to_string(),
            group_id: draft.group_id.clone(),
            content: draft.content.clone(),
            embedding: embedding.to_vec(),
            metadata: draft.metadata.clone(),
            source: draft.source.clone(),
            privacy: draft.privacy,
            tags: draft.tags.clone(),
            pinned: false,
            access_count: 0,
            created_at: now,
            last_accessed: None,
        })
    }

    /// Fetch a record by id.
    pub fn get(&self, id: &str) -> Result<Option<MemoryRecord>> {
        let conn = self.conn();
        let sql = format!("SELECT {RECORD_COLUMNS} FROM memories WHERE id = ?1");
        let record = conn
            .query_row(&sql, params![id], row_to_record)
            .optional()?;
        record.transpose()
    }

    /// Apply an update in place, returning the resulting record.
    ///
    /// `new_embedding` is set only when the content changed and was
    /// re-embedded by the caller.
    pub fn apply_update(
        &self,
        id: &str,
        fields: &UpdateFields,
        new_embedding: Option<&[f32]>,
    ) -> Result<MemoryRecord> {
        let mut record = self
            .get(id)?
            .ok_or_else(|| MemoryError::NotFound { id: id.to_string() })?;

        if let Some(content) = &fields.content {
            record.content = content.clone();
        }
        if let Some(embedding) = new_embedding {
            record.embedding = embedding.to_vec();
        }
        if let Some(metadata) = &fields.metadata {
            record.metadata = Some(merge_metadata(record.metadata.take(), metadata));
        }
        if let Some(tags) = &fields.tags {
            record.tags = tags.clone();
        }
        if let Some(privacy) = fields.privacy {
            record.privacy = privacy;
        }
        if let Some(pinned) = fields.pinned {
            record.pinned = pinned;
        }

        let tags_json = serde_json::to_string(&record.tags)
            .map_err(|e| MemoryError::Decode(format!("tags encode: {e}")))?;
        let metadata_json = record.metadata.as_ref().map(|m| m.to_string());

        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE memories SET content = ?1, embedding = ?2, metadata = ?3, tags = ?4, \
             privacy = ?5, pinned = ?6 WHERE id = ?7",
            params![
                record.content,
                embedding_to_bytes(&record.embedding),
                metadata_json,
                tags_json,
                record.privacy.as_str(),
                record.pinned as i64,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(MemoryError::NotFound { id: id.to_string() });
        }
        Ok(record)
    }

    /// Delete a record. Returns `false` if no row existed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.conn();
        let changed = conn.execute("DELETE FROM memories WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Filtered, offset-paginated list, newest first, restricted to what the
    /// caller may see: their own records plus shared/public records of others.
    pub fn list(
        &self,
        caller: &Caller,
        page: usize,
        limit: usize,
        filter: &ListFilter,
    ) -> Result<Vec<MemoryRecord>> {
        let page = page.max(1);
        let mut sql = format!(
            "SELECT {RECORD_COLUMNS} FROM memories \
             WHERE (owner_id = ?1 OR privacy IN ('shared', 'public'))"
        );
        let mut bindings: Vec<Box<dyn rusqlite::types::ToSql>> =
            vec![Box::new(caller.id.clone())];

        if let Some(group_id) = &filter.group_id {
            bindings.push(Box::new(group_id.clone()));
            sql.push_str(&format!(" AND group_id = ?{}", bindings.len()));
        }
        if let Some(source) = &filter.source {
            bindings.push(Box::new(source.clone()));
            sql.push_str(&format!(" AND source = ?{}", bindings.len()));
        }
        if let Some(privacy) = filter.privacy {
            bindings.push(Box::new(privacy.as_str()));
            sql.push_str(&format!(" AND privacy = ?{}", bindings.len()));
        }
        if let Some(tag) = &filter.tag {
            // Tags are a JSON array of strings; json_each yields bare values.
            bindings.push(Box::new(tag.clone()));
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM json_each(memories.tags) WHERE json_each.value = ?{})",
                bindings.len()
            ));
        }

        bindings.push(Box::new(limit as i64));
        sql.push_str(&format!(" ORDER BY created_at DESC, id DESC LIMIT ?{}", bindings.len()));
        bindings.push(Box::new(((page - 1) * limit) as i64));
        sql.push_str(&format!(" OFFSET ?{}", bindings.len()));

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            bindings.iter().map(|b| b.as_ref()).collect();
        let rows = stmt
            .query_map(params_ref.as_slice(), row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().collect()
    }

    /// Every record belonging to one owner, newest first (export path).
    pub fn owner_records(&self, owner_id: &str) -> Result<Vec<MemoryRecord>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM memories WHERE owner_id = ?1 \
             ORDER BY created_at DESC, id DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![owner_id], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().collect()
    }

    /// Ids of unpinned records created before `cutoff` (RFC 3339), any owner.
    /// Feeds the cleanup pass; pinned records are exempt.
    pub fn stale_ids(&self, cutoff: &str) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id FROM memories WHERE pinned = 0 AND created_at < ?1 ORDER BY created_at, id",
        )?;
        let ids = stmt
            .query_map(params![cutoff], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Every record's id and stored embedding, for index rebuilds.
    ///
    /// Reads the blob column only — recovery must work even when the
    /// embedding provider is unavailable.
    pub fn all_embeddings(&self) -> Result<Vec<(String, Vec<f32>)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, embedding FROM memories ORDER BY created_at, id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, blob)| Ok((id, bytes_to_embedding(&blob)?)))
            .collect()
    }

    /// Bump access_count and last_accessed for records returned by a read path.
    pub fn touch_access(&self, ids: &[&str]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let now = chrono::Utc::now().to_rfc3339();
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "UPDATE memories SET access_count = access_count + 1, last_accessed = ?1 WHERE id = ?2",
        )?;
        for id in ids {
            stmt.execute(params![now, id])?;
        }
        Ok(())
    }

    /// Run a read-only closure against the connection (stats queries).
    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn();
        f(&conn)
    }
}

/// Merge a metadata update into the stored value. Object updates merge
/// key-wise with the update winning; anything else replaces wholesale.
fn merge_metadata(
    existing: Option<serde_json::Value>,
    update: &serde_json::Value,
) -> serde_json::Value {
    match (existing, update) {
        (Some(serde_json::Value::Object(mut base)), serde_json::Value::Object(update)) => {
            for (key, value) in update {
                base.insert(key.clone(), value.clone());
            }
            serde_json::Value::Object(base)
        }
        (_, update) => update.clone(),
    }
}

/// Map a SQL row to a record. Decoding failures are deferred so rusqlite's
/// row mapping stays infallible.
fn row_to_record(row: &Row<'_>) -> rusqlite::Result<Result<MemoryRecord>> {
    let embedding_blob: Vec<u8> = row.get(4)?;
    let metadata_str: Option<String> = row.get(5)?;
    let privacy_str: String = row.get(7)?;
    let tags_str: String = row.get(8)?;

    Ok(build_record(
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        embedding_blob,
        metadata_str,
        row.get(6)?,
        privacy_str,
        tags_str,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
        row.get(12)?,
    ))
}

#[allow(clippy::too_many_arguments)]
fn build_record(
    id: String,
    owner_id: String,
    group_id: Option<String>,
    content: String,
    embedding_blob: Vec<u8>,
    metadata_str: Option<String>,
    source: Option<String>,
    privacy_str: String,
    tags_str: String,
    pinned: bool,
    access_count: u32,
    created_at: String,
    last_accessed: Option<String>,
) -> Result<MemoryRecord> {
    let embedding = bytes_to_embedding(&embedding_blob)?;
    let privacy = privacy_str
        .parse()
        .map_err(MemoryError::Decode)?;
    let tags: Vec<String> = serde_json::from_str(&tags_str)
        .map_err(|e| MemoryError::Decode(format!("tags decode: {e}")))?;
    let metadata = metadata_str.and_then(|s| serde_json::from_str(&s).ok());

    Ok(MemoryRecord {
        id,
        owner_id,
        group_id,
        content,
        embedding,
        metadata,
        source,
        privacy,
        tags,
        pinned,
        access_count,
        created_at,
        last_accessed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::memory::types::PrivacyLevel;

    fn test_store() -> MetadataStore {
        MetadataStore::new(db::open_memory_database().unwrap())
    }

    fn embedding(axis: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; 8];
        v[axis % 8] = 1.0;
        v
    }

    #[test]
    fn create_and_get_round_trip() {
        let store = test_store();
        let draft = AddMemory::new("Rust is a systems language")
            .privacy(PrivacyLevel::Public)
            .source("chat")
            .tags(vec!["lang".into()]);

        let record = store.create("alice", &draft, &embedding(0)).unwrap();
        let loaded = store.get(&record.id).unwrap().unwrap();

        assert_eq!(loaded.content, "Rust is a systems language");
        assert_eq!(loaded.owner_id, "alice");
        assert_eq!(loaded.privacy, PrivacyLevel::Public);
        assert_eq!(loaded.tags, vec!["lang".to_string()]);
        assert_eq!(loaded.embedding, embedding(0));
        assert_eq!(loaded.access_count, 0);
        assert!(loaded.last_accessed.is_none());
    }

    #[test]
    fn get_missing_returns_none() {
        let store = test_store();
        assert!(store.get("nonexistent").unwrap().is_none());
    }

    #[test]
    fn apply_update_changes_fields() {
        let store = test_store();
        let record = store
            .create("alice", &AddMemory::new("old text"), &embedding(0))
            .unwrap();

        let fields = UpdateFields {
            content: Some("new text".into()),
            privacy: Some(PrivacyLevel::Shared),
            pinned: Some(true),
            ..Default::default()
        };
        let updated = store
            .apply_update(&record.id, &fields, Some(&embedding(1)))
            .unwrap();

        assert_eq!(updated.content, "new text");
        assert_eq!(updated.privacy, PrivacyLevel::Shared);
        assert!(updated.pinned);
        assert_eq!(updated.embedding, embedding(1));

        // Persisted, not just in the returned copy
        let loaded = store.get(&record.id).unwrap().unwrap();
        assert_eq!(loaded.content, "new text");
        assert_eq!(loaded.embedding, embedding(1));
    }

    #[test]
    fn apply_update_merges_metadata_objects() {
        let store = test_store();
        let record = store
            .create(
                "alice",
                &AddMemory::new("annotated")
                    .metadata(serde_json::json!({"a": 1, "b": 2})),
                &embedding(0),
            )
            .unwrap();

        let fields = UpdateFields {
            metadata: Some(serde_json::json!({"b": 3, "c": 4})),
            ..Default::default()
        };
        let updated = store.apply_update(&record.id, &fields, None).unwrap();
        assert_eq!(
            updated.metadata,
            Some(serde_json::json!({"a": 1, "b": 3, "c": 4}))
        );

        // Non-object updates replace wholesale.
        let fields = UpdateFields {
            metadata: Some(serde_json::json!("plain note")),
            ..Default::default()
        };
        let updated = store.apply_update(&record.id, &fields, None).unwrap();
        assert_eq!(updated.metadata, Some(serde_json::json!("plain note")));
    }

    #[test]
    fn apply_update_missing_is_not_found() {
        let store = test_store();
        let result = store.apply_update("ghost", &UpdateFields::default(), None);
        assert!(matches!(result, Err(MemoryError::NotFound { .. })));
    }

    #[test]
    fn delete_reports_row_presence() {
        let store = test_store();
        let record = store
            .create("alice", &AddMemory::new("ephemeral"), &embedding(0))
            .unwrap();

        assert!(store.delete(&record.id).unwrap());
        assert!(!store.delete(&record.id).unwrap());
        assert!(store.get(&record.id).unwrap().is_none());
    }

    #[test]
    fn list_is_newest_first_and_paginated() {
        let store = test_store();
        let mut ids = Vec::new();
        for i in 0..5 {
            let record = store
                .create("alice", &AddMemory::new(format!("note {i}")), &embedding(i))
                .unwrap();
            ids.push(record.id);
        }

        let caller = Caller::user("alice");
        let page1 = store.list(&caller, 1, 2, &ListFilter::default()).unwrap();
        let page2 = store.list(&caller, 2, 2, &ListFilter::default()).unwrap();

        assert_eq!(page1.len(), 2);
        assert_eq!(page1[0].id, ids[4]);
        assert_eq!(page1[1].id, ids[3]);
        assert_eq!(page2[0].id, ids[2]);
    }

    #[test]
    fn list_hides_foreign_private_records() {
        let store = test_store();
        store
            .create("alice", &AddMemory::new("alice private"), &embedding(0))
            .unwrap();
        store
            .create(
                "alice",
                &AddMemory::new("alice public").privacy(PrivacyLevel::Public),
                &embedding(1),
            )
            .unwrap();

        let bob = Caller::user("bob");
        let visible = store.list(&bob, 1, 10, &ListFilter::default()).unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].content, "alice public");
    }

    #[test]
    fn list_filters_by_tag_source_group() {
        let store = test_store();
        store
            .create(
                "alice",
                &AddMemory::new("tagged")
                    .tags(vec!["work".into()])
                    .source("chat")
                    .group("proj-1"),
                &embedding(0),
            )
            .unwrap();
        store
            .create("alice", &AddMemory::new("untagged"), &embedding(1))
            .unwrap();

        let caller = Caller::user("alice");
        let by_tag = store
            .list(
                &caller,
                1,
                10,
                &ListFilter {
                    tag: Some("work".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(by_tag.len(), 1);
        assert_eq!(by_tag[0].content, "tagged");

        let by_source = store
            .list(
                &caller,
                1,
                10,
                &ListFilter {
                    source: Some("chat".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(by_source.len(), 1);

        let by_group = store
            .list(
                &caller,
                1,
                10,
                &ListFilter {
                    group_id: Some("proj-1".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(by_group.len(), 1);
    }

    #[test]
    fn stale_ids_skip_pinned_and_recent() {
        let store = test_store();
        let old = store
            .create("alice", &AddMemory::new("forgettable"), &embedding(0))
            .unwrap();
        let pinned = store
            .create("alice", &AddMemory::new("keepsake"), &embedding(1))
            .unwrap();
        store
            .create("alice", &AddMemory::new("fresh"), &embedding(2))
            .unwrap();

        let backdated = (chrono::Utc::now() - chrono::Duration::days(60)).to_rfc3339();
        let conn = store.conn();
        conn.execute(
            "UPDATE memories SET created_at = ?1 WHERE id IN (?2, ?3)",
            params![backdated, old.id, pinned.id],
        )
        .unwrap();
        drop(conn);
        store
            .apply_update(
                &pinned.id,
                &UpdateFields {
                    pinned: Some(true),
                    ..Default::default()
                },
                None,
            )
            .unwrap();

        let cutoff = (chrono::Utc::now() - chrono::Duration::days(30)).to_rfc3339();
        let stale = store.stale_ids(&cutoff).unwrap();
        assert_eq!(stale, vec![old.id]);
    }

    #[test]
    fn all_embeddings_reads_stored_blobs() {
        let store = test_store();
        let a = store
            .create("alice", &AddMemory::new("first"), &embedding(0))
            .unwrap();
        let b = store
            .create("alice", &AddMemory::new("second"), &embedding(1))
            .unwrap();

        let all = store.all_embeddings().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], (a.id, embedding(0)));
        assert_eq!(all[1], (b.id, embedding(1)));
    }

    #[test]
    fn touch_access_bumps_counters() {
        let store = test_store();
        let record = store
            .create("alice", &AddMemory::new("touched"), &embedding(0))
            .unwrap();

        store.touch_access(&[record.id.as_str()]).unwrap();
        store.touch_access(&[record.id.as_str()]).unwrap();

        let loaded = store.get(&record.id).unwrap().unwrap();
        assert_eq!(loaded.access_count, 2);
        assert!(loaded.last_accessed.is_some());
    }
}
