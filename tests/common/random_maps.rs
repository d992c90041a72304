//! Seeded random maps and incoming batches

use mindstream::{MindMap, Node};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

pub const VOCAB: &[&str] = &[
    "Goals", "Budget", "Hiring", "Roadmap", "Risks", "Timeline", "Marketing", "Design review",
    "Launch", "Metrics", "Onboarding", "Pricing", "Support", "Security", "Retro", "Q3 plan",
    "Vendors", "Legal", "Infra", "Docs",
];

/// A well-formed map of up to `size` nodes with distinct texts.
///
/// Ids are `e0..`; each node's parent, if any, is an earlier node.
pub fn random_map(rng: &mut StdRng, size: usize) -> MindMap {
    let mut words: Vec<&str> = VOCAB.to_vec();
    words.shuffle(rng);

    let mut nodes: Vec<Node> = Vec::new();
    for (i, word) in words.into_iter().take(size).enumerate() {
        let mut node = Node::new(format!("e{}", i), word);
        if i > 0 && rng.gen_bool(0.6) {
            node.parent = Some(format!("e{}", rng.gen_range(0..i)));
        }
        nodes.push(node);
    }
    MindMap::from_nodes(nodes)
}

/// An incoming batch against `existing`: texts may repeat existing ones
/// (in any case), ids may collide with existing ids, and parents may point
/// into the batch, into `existing`, or nowhere.
pub fn random_batch(rng: &mut StdRng, existing: &MindMap, size: usize) -> Vec<Node> {
    let mut batch: Vec<Node> = Vec::new();
    for i in 0..size {
        let id = if i < existing.len() && rng.gen_bool(0.3) {
            format!("e{}", i)
        } else {
            format!("n{}", i)
        };

        let word = VOCAB[rng.gen_range(0..VOCAB.len())];
        let text = if rng.gen_bool(0.3) {
            word.to_uppercase()
        } else {
            word.to_string()
        };

        let mut node = Node::new(id, text);
        node.parent = match rng.gen_range(0..4) {
            0 if !batch.is_empty() => Some(batch[rng.gen_range(0..batch.len())].id.clone()),
            1 if !existing.is_empty() => {
                Some(existing.nodes[rng.gen_range(0..existing.len())].id.clone())
            }
            2 => Some("missing".to_string()),
            _ => None,
        };
        batch.push(node);
    }
    batch
}
