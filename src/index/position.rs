//! Bidirectional record-id <-> slot association.
//!
//! Both directions are kept consistent on every mutation: a slot maps to at
//! most one id and an id to at most one slot. Re-pointing an id (update path)
//! drops the old slot mapping first.

use std::collections::HashMap;

/// id <-> slot map for the vector index.
#[derive(Debug, Clone, Default)]
pub struct PositionMap {
    by_id: HashMap<String, usize>,
    by_slot: HashMap<usize, String>,
}

impl PositionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted id -> slot entries (snapshot load path).
    pub(crate) fn from_entries(entries: HashMap<String, usize>) -> Self {
        let by_slot = entries
            .iter()
            .map(|(id, slot)| (*slot, id.clone()))
            .collect();
        Self {
            by_id: entries,
            by_slot,
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Associate `id` with `slot`, replacing any previous slot for that id.
    pub fn insert(&mut self, id: &str, slot: usize) {
        if let Some(old_slot) = self.by_id.insert(id.to_string(), slot) {
            self.by_slot.remove(&old_slot);
        }
        self.by_slot.insert(slot, id.to_string());
    }

    /// Drop the mapping for `id`, returning its slot if one existed.
    pub fn remove(&mut self, id: &str) -> Option<usize> {
        let slot = self.by_id.remove(id)?;
        self.by_slot.remove(&slot);
        Some(slot)
    }

    pub fn slot_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn id_of(&self, slot: usize) -> Option<&str> {
        self.by_slot.get(&slot).map(String::as_str)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// id -> slot entries for snapshot serialization.
    pub(crate) fn entries(&self) -> &HashMap<String, usize> {
        &self.by_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup_both_directions() {
        let mut map = PositionMap::new();
        map.insert("a", 0);
        map.insert("b", 1);

        assert_eq!(map.slot_of("a"), Some(0));
        assert_eq!(map.id_of(1), Some("b"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn remove_clears_both_directions() {
        let mut map = PositionMap::new();
        map.insert("a", 0);

        assert_eq!(map.remove("a"), Some(0));
        assert_eq!(map.slot_of("a"), None);
        assert_eq!(map.id_of(0), None);
        assert_eq!(map.remove("a"), None);
    }

    #[test]
    fn repoint_drops_old_slot() {
        let mut map = PositionMap::new();
        map.insert("a", 0);
        map.insert("a", 5);

        assert_eq!(map.slot_of("a"), Some(5));
        assert_eq!(map.id_of(0), None);
        assert_eq!(map.id_of(5), Some("a"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn from_entries_round_trip() {
        let mut map = PositionMap::new();
        map.insert("a", 3);
        map.insert("b", 7);

        let rebuilt = PositionMap::from_entries(map.entries().clone());
        assert_eq!(rebuilt.slot_of("a"), Some(3));
        assert_eq!(rebuilt.id_of(7), Some("b"));
        assert_eq!(rebuilt.len(), 2);
    }
}
