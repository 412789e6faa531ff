//! In-process vector index with stable identities.
//!
//! Three pieces, owned together by the memory manager:
//!
//! - [`vector::VectorIndex`] — flat brute-force L2 index whose slots survive
//!   removals: removing a vector vacates its slot instead of renumbering the
//!   rest, which eliminates the stale-slot bug class entirely
//! - [`position::PositionMap`] — bidirectional record-id <-> slot map
//! - [`snapshot`] — the paired on-disk files the two above round-trip through
//!
//! Invariant: the number of live slots always equals the number of map
//! entries. The manager checks this after load and rebuilds from the metadata
//! store when it does not hold.

pub mod position;
pub mod snapshot;
pub mod vector;

pub use position::PositionMap;
pub use vector::VectorIndex;

/// Convert a squared-L2 distance to a similarity score in (0, 1].
///
/// Identical vectors score 1.0; the score decays toward 0 with distance.
pub fn distance_to_similarity(distance: f32) -> f32 {
    1.0 / (1.0 + distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn similarity_range() {
        assert_eq!(distance_to_similarity(0.0), 1.0);
        assert!(distance_to_similarity(1.0) < 1.0);
        assert!(distance_to_similarity(1000.0) > 0.0);
    }
}
