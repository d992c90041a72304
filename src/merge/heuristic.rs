//! Deterministic local merge

use super::{fresh_id, normalize_text, settle, MergeOutcome, TreeMerger};
use crate::error::MindstreamError;
use crate::map::{MindMap, Node};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Merges by normalized-text equality, without a backend call.
///
/// Existing nodes are kept exactly. An incoming node whose text matches a node
/// already in the map (existing, or earlier in the batch) is dropped and its
/// children re-pointed at the match. Incoming ids that collide with existing
/// ones are re-namespaced. Incoming parents resolve within the batch first,
/// then against existing ids; anything else becomes a root.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicMerger;

impl HeuristicMerger {
    pub fn new() -> Self {
        Self
    }

    /// The merge itself; synchronous since it never leaves the process.
    pub fn merge_now(&self, existing: &MindMap, new_nodes: &[Node]) -> MergeOutcome {
        if new_nodes.is_empty() {
            return MergeOutcome::unchanged(settle(existing.nodes.clone()).0);
        }

        let existing_ids: HashSet<&str> = existing.ids();
        let mut taken: HashSet<String> = existing.nodes.iter().map(|n| n.id.clone()).collect();
        taken.extend(new_nodes.iter().map(|n| n.id.clone()));

        let mut by_text: HashMap<String, String> = HashMap::new();
        for node in &existing.nodes {
            by_text
                .entry(normalize_text(&node.text))
                .or_insert_with(|| node.id.clone());
        }

        let mut outcome = MergeOutcome::unchanged(MindMap::new());
        // incoming id → id it resolves to in the output
        let mut resolved: HashMap<String, String> = HashMap::new();
        let mut kept: Vec<Node> = Vec::new();

        for node in new_nodes {
            if resolved.contains_key(&node.id) {
                continue;
            }
            let key = normalize_text(&node.text);
            if let Some(survivor) = by_text.get(&key) {
                resolved.insert(node.id.clone(), survivor.clone());
                outcome.collapsed.push(node.id.clone());
                continue;
            }

            let id = if existing_ids.contains(node.id.as_str()) {
                let id = fresh_id(&node.id, &taken);
                taken.insert(id.clone());
                outcome.renamed.push((node.id.clone(), id.clone()));
                id
            } else {
                node.id.clone()
            };

            by_text.insert(key, id.clone());
            resolved.insert(node.id.clone(), id.clone());
            let mut node = node.clone();
            node.id = id;
            kept.push(node);
        }

        for node in kept.iter_mut() {
            node.parent = match node.parent.take() {
                Some(p) => match resolved.get(&p) {
                    Some(id) => Some(id.clone()),
                    None if existing_ids.contains(p.as_str()) => Some(p),
                    None => None,
                },
                None => None,
            };
        }

        let mut nodes = existing.nodes.clone();
        nodes.extend(kept);
        outcome.map = settle(nodes).0;

        debug!(
            nodes = outcome.map.len(),
            collapsed = outcome.collapsed.len(),
            renamed = outcome.renamed.len(),
            "merged heuristically"
        );
        outcome
    }
}

#[async_trait]
impl TreeMerger for HeuristicMerger {
    fn id(&self) -> &str {
        "heuristic"
    }

    async fn merge(
        &self,
        existing: &MindMap,
        new_nodes: &[Node],
    ) -> Result<MergeOutcome, MindstreamError> {
        Ok(self.merge_now(existing, new_nodes))
    }
}
