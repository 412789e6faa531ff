//! Slot-stable flat vector index.
//!
//! Vectors occupy slots assigned at insertion. Removal vacates a slot without
//! shifting any other live slot, so a slot number handed out once stays valid
//! until that exact vector is removed. Search is exhaustive squared-L2 over
//! live slots — adequate for a personal corpus, and exactly reproducible.

use serde::{Deserialize, Serialize};

use crate::error::{MemoryError, Result};

/// Flat L2 index. Slot numbers are stable across removals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    dimensions: usize,
    slots: Vec<Option<Vec<f32>>>,
    live: usize,
}

impl VectorIndex {
    /// Create an empty index for vectors of `dimensions` entries.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            slots: Vec::new(),
            live: 0,
        }
    }

    /// Rebuild an index from raw slot storage (snapshot load path).
    pub(crate) fn from_slots(dimensions: usize, slots: Vec<Option<Vec<f32>>>) -> Self {
        let live = slots.iter().filter(|s| s.is_some()).count();
        Self {
            dimensions,
            slots,
            live,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of live vectors (vacated slots do not count).
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub(crate) fn slots(&self) -> &[Option<Vec<f32>>] {
        &self.slots
    }

    /// Append a vector, returning its slot. Fails only on dimension mismatch.
    pub fn insert(&mut self, vector: Vec<f32>) -> Result<usize> {
        if vector.len() != self.dimensions {
            return Err(MemoryError::InvalidInput(format!(
                "vector has {} dimensions, index expects {}",
                vector.len(),
                self.dimensions
            )));
        }
        self.slots.push(Some(vector));
        self.live += 1;
        Ok(self.slots.len() - 1)
    }

    /// Vacate a slot. Other live slots keep their numbers.
    pub fn remove(&mut self, slot: usize) -> Result<Vec<f32>> {
        match self.slots.get_mut(slot).and_then(|s| s.take()) {
            Some(vector) => {
                self.live -= 1;
                Ok(vector)
            }
            None => Err(MemoryError::Inconsistent(format!(
                "remove on vacant or out-of-range slot {slot}"
            ))),
        }
    }

    /// The vector at `slot`, if the slot is live.
    pub fn get(&self, slot: usize) -> Option<&[f32]> {
        self.slots.get(slot)?.as_deref()
    }

    /// K-nearest live slots by squared L2 distance, ascending, capped at the
    /// live count. Ties keep slot order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimensions {
            return Err(MemoryError::InvalidInput(format!(
                "query has {} dimensions, index expects {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut hits: Vec<(usize, f32)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(slot, v)| v.as_deref().map(|v| (slot, squared_l2(query, v))))
            .collect();

        hits.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        hits.truncate(k);
        Ok(hits)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
