mod helpers;

use helpers::{alice, bob, open_manager, seed_scenario};
use mnemo::memory::types::{AddMemory, PrivacyLevel};

#[test]
fn cross_owner_search_ranks_and_filters() {
    let dir = tempfile::tempdir().unwrap();
    let manager = open_manager(dir.path());
    let (cat_id, revenue_id, dog_id) = seed_scenario(&manager);

    // Bob's query overlaps the cat fact more than the dog fact, and the
    // private revenue figure must never surface for him.
    let hits = manager
        .search(&bob(), "a feline on a rug", 2, None, None, 0.0)
        .unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].record.id, cat_id);
    assert_eq!(hits[1].record.id, dog_id);
    assert!(hits[0].similarity > hits[1].similarity);
    assert!(hits.iter().all(|h| h.record.id != revenue_id));

    // The owner does see the private record.
    let own = manager
        .search(&alice(), "Quarterly revenue grew 12%", 1, None, None, 0.0)
        .unwrap();
    assert_eq!(own[0].record.id, revenue_id);
}

#[test]
fn repeated_searches_are_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let manager = open_manager(dir.path());
    seed_scenario(&manager);

    let first = manager
        .search(&bob(), "a feline on a rug", 5, None, None, 0.0)
        .unwrap();
    let second = manager
        .search(&bob(), "a feline on a rug", 5, None, None, 0.0)
        .unwrap();

    let ids = |hits: &[mnemo::memory::types::SearchHit]| {
        hits.iter().map(|h| h.record.id.clone()).collect::<Vec<_>>()
    };
    assert_eq!(ids(&first), ids(&second));
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.similarity, b.similarity);
    }
}

#[test]
fn k_zero_returns_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let manager = open_manager(dir.path());
    seed_scenario(&manager);

    let hits = manager
        .search(&bob(), "a feline on a rug", 0, None, None, 0.0)
        .unwrap();
    assert!(hits.is_empty());
}

#[test]
fn k_truncates_results() {
    let dir = tempfile::tempdir().unwrap();
    let manager = open_manager(dir.path());
    seed_scenario(&manager);

    let hits = manager
        .search(&alice(), "a feline on a rug", 1, None, None, 0.0)
        .unwrap();
    assert_eq!(hits.len(), 1);
}

#[test]
fn overfetch_skips_past_invisible_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let manager = open_manager(dir.path());

    // Two private records match the query exactly, so they rank above bob's
    // own record but are invisible to him. Candidate overfetch has to reach
    // past them.
    manager
        .add(&alice(), AddMemory::new("team roadmap planning"))
        .unwrap();
    manager
        .add(&alice(), AddMemory::new("team roadmap planning"))
        .unwrap();
    let visible = manager
        .add(&bob(), AddMemory::new("roadmap planning notes"))
        .unwrap();

    let hits = manager
        .search(&bob(), "team roadmap planning", 1, None, None, 0.0)
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].record.id, visible.id);
}

#[test]
fn min_similarity_drops_weak_matches() {
    let dir = tempfile::tempdir().unwrap();
    let manager = open_manager(dir.path());
    seed_scenario(&manager);

    // Orthogonal vectors sit at similarity 1/3 and the dog fact only shares
    // stopwords with the query; a high floor keeps just the exact match.
    let hits = manager
        .search(&alice(), "The cat sat on the mat", 5, None, None, 0.9)
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].record.content, "The cat sat on the mat");
}

#[test]
fn privacy_level_and_group_filters_compose() {
    let dir = tempfile::tempdir().unwrap();
    let manager = open_manager(dir.path());

    manager
        .add(
            &alice(),
            AddMemory::new("sprint retro notes")
                .privacy(PrivacyLevel::Public)
                .group("proj-a"),
        )
        .unwrap();
    manager
        .add(
            &alice(),
            AddMemory::new("sprint retro notes")
                .privacy(PrivacyLevel::Public)
                .group("proj-b"),
        )
        .unwrap();
    manager
        .add(&alice(), AddMemory::new("sprint retro notes").group("proj-a"))
        .unwrap();

    let hits = manager
        .search(
            &alice(),
            "sprint retro notes",
            5,
            Some(&[PrivacyLevel::Public]),
            Some("proj-a"),
            0.0,
        )
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].record.privacy, PrivacyLevel::Public);
    assert_eq!(hits[0].record.group_id.as_deref(), Some("proj-a"));
}
