//! Memory manager — orchestrates the embedding provider, the metadata record
//! store, and the vector index + position map pair.
//!
//! Consistency between the two stores is maintained by operation ordering,
//! not a shared transaction:
//!
//! - `add` creates the metadata record before inserting the vector, so a
//!   failure can only leave an unindexed record (recovered by [`reindex`])
//! - `delete` removes the index entry before the metadata row, so a crash
//!   leaves at worst an orphan row, never a dangling index entry
//! - `search` tolerates stale index entries by skipping and logging them
//!
//! Embedding always happens before the index lock is taken — it is the only
//! operation expected to block for non-trivial wall-clock time and touches
//! neither the index nor the map.
//!
//! [`reindex`]: MemoryManager::reindex

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, warn};

use crate::embedding::EmbeddingProvider;
use crate::error::{MemoryError, Result};
use crate::index::{distance_to_similarity, snapshot, PositionMap, VectorIndex};
use crate::memory::stats::{owner_stats, MemoryStats};
use crate::memory::store::MetadataStore;
use crate::memory::types::{
    AddMemory, Caller, ListFilter, MemoryRecord, PrivacyLevel, SearchHit, UpdateFields,
};

/// Search candidates fetched per requested result, compensating for
/// candidates later dropped by permission and similarity filtering.
const OVERFETCH_FACTOR: usize = 3;

struct IndexState {
    index: VectorIndex,
    map: PositionMap,
}

/// Orchestrator owning the vector index and position map for one process.
///
/// All index-touching operations are serialized under a single coarse lock;
/// `list` and `stats` touch only the metadata store and may run concurrently
/// with index mutations.
pub struct MemoryManager {
    provider: Arc<dyn EmbeddingProvider>,
    store: MetadataStore,
    snapshot_base: PathBuf,
    inner: Mutex<IndexState>,
}

impl MemoryManager {
    /// Construct the manager, loading the snapshot pair if present and
    /// otherwise rebuilding the index from embeddings stored in the metadata
    /// store. The rebuild path never calls the embedding provider.
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        store: MetadataStore,
        snapshot_base: PathBuf,
    ) -> Result<Self> {
        let dimensions = provider.dimensions();

        let state = match snapshot::load(&snapshot_base, dimensions) {
            Ok(Some((index, map))) => {
                info!(entries = map.len(), "loaded index snapshot");
                IndexState { index, map }
            }
            Ok(None) => {
                let state = rebuild_state(&store, dimensions)?;
                if state.map.len() > 0 {
                    info!(entries = state.map.len(), "rebuilt index from stored embeddings");
                }
                snapshot::save(&snapshot_base, &state.index, &state.map)?;
                state
            }
            Err(e) => {
                warn!(error = %e, "snapshot pair unusable, rebuilding from store");
                let state = rebuild_state(&store, dimensions)?;
                snapshot::save(&snapshot_base, &state.index, &state.map)?;
                state
            }
        };

        Ok(Self {
            provider,
            store,
            snapshot_base,
            inner: Mutex::new(state),
        })
    }

    fn lock(&self) -> MutexGuard<'_, IndexState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Embed text through the provider, validating the dimension contract.
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self
            .provider
            .embed(text)
            .map_err(|e| MemoryError::Embedding(e.to_string()))?;
        if vector.len() != self.provider.dimensions() {
            return Err(MemoryError::Embedding(format!(
                "provider returned {} dimensions, expected {}",
                vector.len(),
                self.provider.dimensions()
            )));
        }
        Ok(vector)
    }

    /// Add a new memory for the caller.
    ///
    /// Pipeline: embed (outside the lock) → create metadata record → insert
    /// vector → record position → persist snapshot. A failure after the
    /// record was created leaves it unindexed; that window is accepted and
    /// closed by [`reindex`](Self::reindex), not rolled back.
    pub fn add(&self, caller: &Caller, draft: AddMemory) -> Result<MemoryRecord> {
        let vector = self.embed(&draft.content)?;
        let record = self.store.create(&caller.id, &draft, &vector)?;

        let mut state = self.lock();
        let indexed = (|| -> Result<()> {
            let slot = state.index.insert(vector)?;
            state.map.insert(&record.id, slot);
            snapshot::save(&self.snapshot_base, &state.index, &state.map)
        })();
        if let Err(e) = indexed {
            error!(id = %record.id, error = %e, "record stored but not indexed; run reindex");
            return Err(e);
        }

        Ok(record)
    }

    /// Semantic search over records visible to the caller.
    ///
    /// Candidates arrive in ascending-distance order and are filtered by
    /// similarity floor, then access control; ties keep index return order.
    /// Stale index entries (unmapped slot, missing record) are skipped and
    /// logged rather than failing the search.
    pub fn search(
        &self,
        caller: &Caller,
        query: &str,
        k: usize,
        privacy_levels: Option<&[PrivacyLevel]>,
        group_id: Option<&str>,
        min_similarity: f32,
    ) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let query_vector = self.embed(query)?;

        let state = self.lock();
        let fetch = (k * OVERFETCH_FACTOR).min(state.index.len());
        let candidates = state.index.search(&query_vector, fetch)?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut hits: Vec<SearchHit> = Vec::new();

        for (slot, distance) in candidates {
            let similarity = distance_to_similarity(distance);
            if similarity < min_similarity {
                continue;
            }

            let Some(id) = state.map.id_of(slot) else {
                warn!(slot, "search hit an unmapped slot, skipping stale entry");
                continue;
            };
            if !seen.insert(id.to_string()) {
                continue;
            }

            let Some(record) = self.store.get(id)? else {
                warn!(id, "indexed record missing from metadata store, skipping");
                continue;
            };

            if let Some(levels) = privacy_levels {
                if !levels.contains(&record.privacy) {
                    continue;
                }
            }
            if record.privacy == PrivacyLevel::Private && record.owner_id != caller.id {
                continue;
            }
            if let Some(group) = group_id {
                if record.group_id.as_deref() != Some(group) {
                    continue;
                }
            }

            hits.push(SearchHit { record, similarity });
            if hits.len() >= k {
                break;
            }
        }

        let returned: Vec<&str> = hits.iter().map(|h| h.record.id.as_str()).collect();
        self.store.touch_access(&returned)?;

        Ok(hits)
    }

    /// Update a record. Owner or admin only. A content change re-embeds and
    /// replaces the record's vector under the index lock.
    pub fn update(&self, caller: &Caller, id: &str, fields: UpdateFields) -> Result<MemoryRecord> {
        let existing = self
            .store
            .get(id)?
            .ok_or_else(|| MemoryError::NotFound { id: id.to_string() })?;
        if !caller.may_modify(&existing) {
            return Err(MemoryError::PermissionDenied { id: id.to_string() });
        }

        // Re-embed before touching the index; an embedding failure leaves
        // every store untouched.
        let new_vector = match &fields.content {
            Some(content) => Some(self.embed(content)?),
            None => None,
        };

        // Row update and vector swap commit under the same lock, so two
        // racing updates cannot interleave their halves.
        let mut state = self.lock();
        let record = self.store.apply_update(id, &fields, new_vector.as_deref())?;

        if let Some(vector) = new_vector {
            let slot = state.map.slot_of(id).ok_or_else(|| {
                MemoryError::Inconsistent(format!("update target {id} has no index entry; run reindex"))
            })?;
            state.index.remove(slot)?;
            let new_slot = state.index.insert(vector)?;
            state.map.insert(id, new_slot);
        }
        snapshot::save(&self.snapshot_base, &state.index, &state.map)?;

        Ok(record)
    }

    /// Delete a record. Owner or admin only.
    ///
    /// The index entry is removed and the snapshot persisted **before** the
    /// metadata row is deleted.
    pub fn delete(&self, caller: &Caller, id: &str) -> Result<()> {
        let existing = self
            .store
            .get(id)?
            .ok_or_else(|| MemoryError::NotFound { id: id.to_string() })?;
        if !caller.may_modify(&existing) {
            return Err(MemoryError::PermissionDenied { id: id.to_string() });
        }

        let mut state = self.lock();
        let slot = state.map.remove(id).ok_or_else(|| {
            MemoryError::Inconsistent(format!("delete target {id} has no index entry; run reindex"))
        })?;
        state.index.remove(slot)?;
        snapshot::save(&self.snapshot_base, &state.index, &state.map)?;

        if !self.store.delete(id)? {
            warn!(id, "metadata row vanished between index removal and delete");
        }
        Ok(())
    }

    /// Delete unpinned records older than `max_age_days`, any owner. Pinned
    /// records are exempt. Index entries are removed and the snapshot
    /// persisted before the rows are deleted, matching [`delete`](Self::delete).
    /// Returns the number of records removed.
    pub fn cleanup(&self, max_age_days: i64) -> Result<usize> {
        let cutoff = (chrono::Utc::now() - chrono::Duration::days(max_age_days)).to_rfc3339();
        let ids = self.store.stale_ids(&cutoff)?;
        if ids.is_empty() {
            return Ok(0);
        }

        let mut state = self.lock();
        for id in &ids {
            match state.map.remove(id) {
                Some(slot) => {
                    state.index.remove(slot)?;
                }
                None => warn!(id, "stale record has no index entry, removing row only"),
            }
        }
        snapshot::save(&self.snapshot_base, &state.index, &state.map)?;

        let mut removed = 0;
        for id in &ids {
            if self.store.delete(id)? {
                removed += 1;
            }
        }
        info!(removed, max_age_days, "cleanup removed old unpinned memories");
        Ok(removed)
    }

    /// Filtered, paginated listing of records visible to the caller.
    /// Touches only the metadata store.
    pub fn list(
        &self,
        caller: &Caller,
        page: usize,
        limit: usize,
        filter: &ListFilter,
    ) -> Result<Vec<MemoryRecord>> {
        self.store.list(caller, page, limit, filter)
    }

    /// Per-owner statistics plus the live index entry count.
    pub fn stats(&self, owner_id: &str) -> Result<MemoryStats> {
        let mut stats = owner_stats(&self.store, owner_id)?;
        stats.index_entries = self.lock().index.len() as u64;
        Ok(stats)
    }

    /// Rebuild the vector index and position map from the embeddings stored
    /// in the metadata store, then persist a fresh snapshot. The
    /// authoritative recovery mechanism; never calls the embedding provider.
    /// Returns the number of indexed entries.
    pub fn reindex(&self) -> Result<usize> {
        let rebuilt = rebuild_state(&self.store, self.provider.dimensions())?;
        let count = rebuilt.map.len();

        let mut state = self.lock();
        *state = rebuilt;
        snapshot::save(&self.snapshot_base, &state.index, &state.map)?;

        info!(entries = count, "reindex complete");
        Ok(count)
    }

    /// Export the caller's own records as a JSON array (embeddings omitted).
    pub fn export(&self, caller: &Caller, privacy_levels: Option<&[PrivacyLevel]>) -> Result<String> {
        let records = self.store.owner_records(&caller.id)?;
        let exported: Vec<ExportedMemory> = records
            .into_iter()
            .filter(|r| {
                privacy_levels
                    .map(|levels| levels.contains(&r.privacy))
                    .unwrap_or(true)
            })
            .map(ExportedMemory::from)
            .collect();
        serde_json::to_string_pretty(&exported)
            .map_err(|e| MemoryError::Decode(format!("export encode: {e}")))
    }

    /// Import records from an [`export`](Self::export) payload, re-running
    /// the full add pipeline (including re-embedding) for each entry.
    pub fn import(&self, caller: &Caller, payload: &str) -> Result<Vec<MemoryRecord>> {
        let entries: Vec<ExportedMemory> = serde_json::from_str(payload)
            .map_err(|e| MemoryError::InvalidInput(format!("import decode: {e}")))?;

        let mut imported = Vec::with_capacity(entries.len());
        for entry in entries {
            let draft = AddMemory {
                content: entry.content,
                metadata: entry.metadata,
                source: entry.source,
                privacy: entry.privacy,
                tags: entry.tags,
                group_id: entry.group_id,
            };
            imported.push(self.add(caller, draft)?);
        }
        Ok(imported)
    }

    /// Number of live vectors currently indexed.
    pub fn index_len(&self) -> usize {
        self.lock().index.len()
    }
}

/// Portable record shape for export/import. Embeddings are regenerated on
/// import, so they are deliberately absent.
#[derive(Debug, Serialize, Deserialize)]
struct ExportedMemory {
    content: String,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
    #[serde(default)]
    source: Option<String>,
    privacy: PrivacyLevel,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    group_id: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

impl From<MemoryRecord> for ExportedMemory {
    fn from(record: MemoryRecord) -> Self {
        Self {
            content: record.content,
            metadata: record.metadata,
            source: record.source,
            privacy: record.privacy,
            tags: record.tags,
            group_id: record.group_id,
            created_at: Some(record.created_at),
        }
    }
}

/// Build a fresh index state by reinserting every stored embedding.
fn rebuild_state(store: &MetadataStore, dimensions: usize) -> Result<IndexState> {
    let mut index = VectorIndex::new(dimensions);
    let mut map = PositionMap::new();

    for (id, embedding) in store.all_embeddings()? {
        if embedding.len() != dimensions {
            warn!(
                id,
                stored = embedding.len(),
                expected = dimensions,
                "stored embedding has wrong dimension, leaving record unindexed"
            );
            continue;
        }
        let slot = index.insert(embedding)?;
        map.insert(&id, slot);
    }

    Ok(IndexState { index, map })
}
