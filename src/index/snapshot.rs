//! Paired on-disk snapshot of the vector index and position map.
//!
//! Two sibling files share a base path: `<base>.index` (bincode — format
//! version, dimension, slot storage) and `<base>.map` (JSON — format version
//! plus id -> slot entries). The pair must be read and written together; a
//! mismatched pair is the principal disaster scenario, so the writer stages
//! both files under temp names before renaming either into place. That
//! reduces, but does not eliminate, the half-written-pair window — the load
//! path therefore verifies the pair and the caller falls back to a rebuild
//! from the metadata store when verification fails.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{MemoryError, Result};
use crate::index::{PositionMap, VectorIndex};

const INDEX_FORMAT_VERSION: u32 = 1;
const MAP_FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct IndexSnapshot {
    version: u32,
    dimensions: usize,
    slots: Vec<Option<Vec<f32>>>,
}

#[derive(Serialize, Deserialize)]
struct MapSnapshot {
    version: u32,
    entries: HashMap<String, usize>,
}

pub fn index_path(base: &Path) -> PathBuf {
    with_suffix(base, "index")
}

pub fn map_path(base: &Path) -> PathBuf {
    with_suffix(base, "map")
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "memory".to_string());
    name.push('.');
    name.push_str(suffix);
    base.with_file_name(name)
}

/// Write the snapshot pair: map staged first, index second, then both renamed
/// into place.
pub fn save(base: &Path, index: &VectorIndex, map: &PositionMap) -> Result<()> {
    if let Some(parent) = base.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let map_file = map_path(base);
    let index_file = index_path(base);
    let map_tmp = map_file.with_extension("map.tmp");
    let index_tmp = index_file.with_extension("index.tmp");

    let map_snapshot = MapSnapshot {
        version: MAP_FORMAT_VERSION,
        entries: map.entries().clone(),
    };
    let map_bytes = serde_json::to_vec(&map_snapshot)
        .map_err(|e| MemoryError::Decode(format!("map snapshot encode: {e}")))?;
    std::fs::write(&map_tmp, map_bytes)?;

    let index_snapshot = IndexSnapshot {
        version: INDEX_FORMAT_VERSION,
        dimensions: index.dimensions(),
        slots: index.slots().to_vec(),
    };
    let index_bytes = bincode::serialize(&index_snapshot)
        .map_err(|e| MemoryError::Decode(format!("index snapshot encode: {e}")))?;
    std::fs::write(&index_tmp, index_bytes)?;

    std::fs::rename(&map_tmp, &map_file)?;
    std::fs::rename(&index_tmp, &index_file)?;

    debug!(
        base = %base.display(),
        entries = map.len(),
        "snapshot pair written"
    );
    Ok(())
}

/// Load and verify the snapshot pair.
///
/// Returns `Ok(None)` when either file is absent (fresh start or partial
/// pair). Decode or verification failures are errors — the caller logs and
/// rebuilds from the metadata store.
pub fn load(base: &Path, expected_dimensions: usize) -> Result<Option<(VectorIndex, PositionMap)>> {
    let map_file = map_path(base);
    let index_file = index_path(base);

    if !map_file.exists() || !index_file.exists() {
        if map_file.exists() != index_file.exists() {
            warn!(base = %base.display(), "half of snapshot pair missing, ignoring snapshot");
        }
        return Ok(None);
    }

    let index_bytes = std::fs::read(&index_file)?;
    let index_snapshot: IndexSnapshot = bincode::deserialize(&index_bytes)
        .map_err(|e| MemoryError::Decode(format!("index snapshot decode: {e}")))?;

    let map_bytes = std::fs::read(&map_file)?;
    let map_snapshot: MapSnapshot = serde_json::from_slice(&map_bytes)
        .map_err(|e| MemoryError::Decode(format!("map snapshot decode: {e}")))?;

    if index_snapshot.version != INDEX_FORMAT_VERSION {
        return Err(MemoryError::Inconsistent(format!(
            "unsupported index snapshot version {}",
            index_snapshot.version
        )));
    }
    if map_snapshot.version != MAP_FORMAT_VERSION {
        return Err(MemoryError::Inconsistent(format!(
            "unsupported map snapshot version {}",
            map_snapshot.version
        )));
    }
    if index_snapshot.dimensions != expected_dimensions {
        return Err(MemoryError::Inconsistent(format!(
            "snapshot dimension {} does not match configured {}",
            index_snapshot.dimensions, expected_dimensions
        )));
    }

    let index = VectorIndex::from_slots(index_snapshot.dimensions, index_snapshot.slots);
    let map = PositionMap::from_entries(map_snapshot.entries);
    verify_pair(&index, &map)?;

    debug!(base = %base.display(), entries = map.len(), "snapshot pair loaded");
    Ok(Some((index, map)))
}

/// Every map entry must point at a live slot, and live slots and map entries
/// must agree in count.
fn verify_pair(index: &VectorIndex, map: &PositionMap) -> Result<()> {
    if index.len() != map.len() {
        return Err(MemoryError::Inconsistent(format!(
            "snapshot pair mismatch: {} live vectors, {} map entries",
            index.len(),
            map.len()
        )));
    }
    for (id, slot) in map.entries() {
        if index.get(*slot).is_none() {
            return Err(MemoryError::Inconsistent(format!(
                "map entry {id} points at vacant slot {slot}"
            )));
        }
    }
    Ok(())
}
