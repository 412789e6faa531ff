#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use mnemo::db;
use mnemo::embedding::hash::HashEmbeddingProvider;
use mnemo::memory::manager::MemoryManager;
use mnemo::memory::store::MetadataStore;
use mnemo::memory::types::{AddMemory, Caller, PrivacyLevel};

pub const DIM: usize = 384;

/// Open a manager rooted at `dir`, with a file-backed database so a second
/// manager can reopen the same state.
pub fn open_manager(dir: &Path) -> MemoryManager {
    let provider = Arc::new(HashEmbeddingProvider::new(DIM).unwrap());
    let conn = db::open_database(dir.join("memory.db")).unwrap();
    MemoryManager::new(provider, MetadataStore::new(conn), dir.join("memory")).unwrap()
}

pub fn alice() -> Caller {
    Caller::user("alice")
}

pub fn bob() -> Caller {
    Caller::user("bob")
}

/// Seed the three-record fixture used across suites: a public cat fact and a
/// private revenue figure owned by alice, and a public dog fact owned by bob.
/// Returns (cat_id, revenue_id, dog_id).
pub fn seed_scenario(manager: &MemoryManager) -> (String, String, String) {
    let cat = manager
        .add(
            &alice(),
            AddMemory::new("The cat sat on the mat").privacy(PrivacyLevel::Public),
        )
        .unwrap();
    let revenue = manager
        .add(&alice(), AddMemory::new("Quarterly revenue grew 12%"))
        .unwrap();
    let dog = manager
        .add(
            &bob(),
            AddMemory::new("The dog ran in the park").privacy(PrivacyLevel::Public),
        )
        .unwrap();
    (cat.id, revenue.id, dog.id)
}
