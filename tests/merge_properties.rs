//! Property-style merge checks over seeded random maps
//!
//! Each check runs a fixed number of seeds so failures reproduce exactly.

mod common;

use common::{random_batch, random_map};
use mindstream::merge::normalize_text;
use mindstream::{BackendMerger, HeuristicMerger, MindMap, MockBackend, Node, TreeMerger};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;

const SEEDS: u64 = 200;

fn case(seed: u64) -> (MindMap, Vec<Node>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let size = rng.gen_range(0..12);
    let existing = random_map(&mut rng, size);
    let batch_size = rng.gen_range(0..10);
    let batch = random_batch(&mut rng, &existing, batch_size);
    (existing, batch)
}

fn normalized_texts(map: &MindMap) -> HashSet<String> {
    map.nodes.iter().map(|n| normalize_text(&n.text)).collect()
}

#[test]
fn heuristic_merge_keeps_existing_and_covers_batch() {
    let merger = HeuristicMerger::new();
    for seed in 0..SEEDS {
        let (existing, batch) = case(seed);
        let outcome = merger.merge_now(&existing, &batch);
        let merged = &outcome.map;

        assert!(merged.is_well_formed(), "seed {seed}: {:?}", mindstream::map::violations(merged));

        for node in &existing.nodes {
            assert_eq!(merged.get(&node.id), Some(node), "seed {seed}: existing {} changed", node.id);
        }

        let present = normalized_texts(merged);
        for node in &batch {
            assert!(present.contains(&normalize_text(&node.text)), "seed {seed}: lost {}", node.text);
        }

        // Existing texts are distinct, so no topic may appear twice.
        assert_eq!(present.len(), merged.len(), "seed {seed}: duplicate topic");
        assert_eq!(merged.len(), existing.len() + batch.len() - outcome.collapsed.len());
    }
}

#[test]
fn heuristic_merge_is_idempotent() {
    let merger = HeuristicMerger::new();
    for seed in 0..SEEDS {
        let (existing, batch) = case(seed);

        assert_eq!(merger.merge_now(&existing, &[]).map, existing, "seed {seed}");

        let once = merger.merge_now(&existing, &batch).map;
        let twice = merger.merge_now(&once, &batch).map;
        assert_eq!(twice, once, "seed {seed}: second merge changed the map");

        let via_trait = tokio_test::block_on(merger.merge(&existing, &batch)).unwrap();
        assert_eq!(via_trait.map, once, "seed {seed}");
    }
}

#[tokio::test]
async fn backend_merge_survives_a_forgetful_backend() {
    // The backend "merges" by echoing only the new nodes.
    for seed in 0..SEEDS {
        let (existing, batch) = case(seed);
        let echo = serde_json::to_string(&batch).unwrap();
        let merger = BackendMerger::new(Arc::new(MockBackend::available().otherwise(echo)));

        let outcome = merger.merge(&existing, &batch).await.unwrap();
        let merged = &outcome.map;

        assert!(merged.is_well_formed(), "seed {seed}");
        for node in &existing.nodes {
            assert_eq!(merged.get(&node.id), Some(node), "seed {seed}: existing {} changed", node.id);
        }
        let present = normalized_texts(merged);
        for node in &batch {
            assert!(present.contains(&normalize_text(&node.text)), "seed {seed}: lost {}", node.text);
        }
    }
}

#[tokio::test]
async fn backend_merge_cannot_rewrite_existing_nodes() {
    // The backend echoes every existing node shouted and hung under the
    // first new node, followed by the batch.
    for seed in 0..SEEDS {
        let (existing, batch) = case(seed);
        let anchor = batch.first().map(|n| n.id.clone());
        let mut answer: Vec<Node> = existing
            .nodes
            .iter()
            .map(|n| {
                let mut n = n.clone();
                n.text = n.text.to_uppercase();
                n.parent = anchor.clone();
                n
            })
            .collect();
        answer.extend(batch.iter().cloned());
        let reply = serde_json::to_string(&answer).unwrap();
        let merger = BackendMerger::new(Arc::new(MockBackend::available().otherwise(reply)));

        let outcome = merger.merge(&existing, &batch).await.unwrap();

        assert!(outcome.map.is_well_formed(), "seed {seed}");
        for node in &existing.nodes {
            assert_eq!(outcome.map.get(&node.id), Some(node), "seed {seed}: existing {} changed", node.id);
        }
    }
}

#[tokio::test]
async fn backend_merge_garbage_falls_back_to_both_forests() {
    for seed in 0..SEEDS {
        let (existing, batch) = case(seed);
        let merger = BackendMerger::new(Arc::new(
            MockBackend::available().otherwise("Sorry, I can't help with that."),
        ));

        let outcome = merger.merge(&existing, &batch).await.unwrap();

        assert!(outcome.map.is_well_formed(), "seed {seed}");
        if batch.is_empty() {
            assert_eq!(outcome.map, existing);
            continue;
        }
        assert!(outcome.fell_back);
        assert_eq!(outcome.map.len(), existing.len() + batch.len(), "seed {seed}");
        for node in &existing.nodes {
            assert_eq!(outcome.map.get(&node.id), Some(node), "seed {seed}");
        }
    }
}
