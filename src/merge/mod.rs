//! Tree merging: existing map + new nodes → one deduplicated map
//!
//! Two interchangeable implementations of [`TreeMerger`]:
//! - [`BackendMerger`] asks the generative backend to merge, then reconciles
//!   its answer against the additive and id-stability rules
//! - [`HeuristicMerger`] merges locally by normalized-text equality
//!
//! Both return `existing` untouched when there are no new nodes, and both
//! produce maps that pass validation.

mod backend;
mod heuristic;
mod reconcile;

pub use backend::BackendMerger;
pub use heuristic::HeuristicMerger;
pub use reconcile::{reconcile, ReconcileLog};

use crate::error::MindstreamError;
use crate::map::{validate, DanglingParentPolicy, MindMap, Node, ValidationReport};
use crate::parse::StrategyKind;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Result of a merge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeOutcome {
    pub map: MindMap,
    /// Parse strategy that read the backend's answer (backend merges only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyKind>,
    /// True when the backend answer was unusable and the disjoint union was returned
    pub fell_back: bool,
    /// `(old, new)` ids for incoming nodes re-namespaced on collision
    pub renamed: Vec<(String, String)>,
    /// Existing ids the backend dropped and the merger put back
    pub restored: Vec<String>,
    /// Ids of incoming nodes folded into an equivalent node
    pub collapsed: Vec<String>,
}

impl MergeOutcome {
    pub fn unchanged(map: MindMap) -> Self {
        Self {
            map,
            strategy: None,
            fell_back: false,
            renamed: Vec::new(),
            restored: Vec::new(),
            collapsed: Vec::new(),
        }
    }
}

/// Combines an existing map with newly extracted nodes.
#[async_trait]
pub trait TreeMerger: Send + Sync {
    /// Stable identifier for logs and traces
    fn id(&self) -> &str;

    async fn merge(
        &self,
        existing: &MindMap,
        new_nodes: &[Node],
    ) -> Result<MergeOutcome, MindstreamError>;
}

/// Case-, whitespace- and trailing-punctuation-insensitive form of a node text.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .trim_end_matches(['.', ',', ';', ':', '!', '?'])
        .to_string()
}

/// First `<base>-<n>` (n ≥ 1) not in `taken`.
pub(crate) fn fresh_id(base: &str, taken: &HashSet<String>) -> String {
    (1..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| format!("{}-x", base))
}

/// `existing` plus `new_nodes` as two disjoint forests.
///
/// Incoming ids that collide with existing ones are re-namespaced; incoming
/// parents are resolved only within the batch, so no new node hangs off an
/// existing one. Returns the map and the renames applied.
pub fn disjoint_union(existing: &MindMap, new_nodes: &[Node]) -> (MindMap, Vec<(String, String)>) {
    let existing_ids: HashSet<String> = existing.nodes.iter().map(|n| n.id.clone()).collect();
    let batch_ids: HashSet<&str> = new_nodes.iter().map(|n| n.id.as_str()).collect();
    let mut taken: HashSet<String> = existing_ids.clone();
    taken.extend(batch_ids.iter().map(|id| id.to_string()));

    let mut renames: HashMap<String, String> = HashMap::new();
    let mut renamed = Vec::new();
    for node in new_nodes {
        if existing_ids.contains(&node.id) && !renames.contains_key(&node.id) {
            let id = fresh_id(&node.id, &taken);
            taken.insert(id.clone());
            renames.insert(node.id.clone(), id.clone());
            renamed.push((node.id.clone(), id));
        }
    }

    let mut nodes = existing.nodes.clone();
    for node in new_nodes {
        let mut node = node.clone();
        if let Some(id) = renames.get(&node.id) {
            node.id = id.clone();
        }
        node.parent = match node.parent.take() {
            Some(p) if batch_ids.contains(p.as_str()) => Some(renames.get(&p).cloned().unwrap_or(p)),
            _ => None,
        };
        nodes.push(node);
    }

    (settle(nodes).0, renamed)
}

/// Final invariant pass for merger output. Parents are always promoted here:
/// a merge never discards nodes over a broken link.
pub(crate) fn settle(nodes: Vec<Node>) -> (MindMap, ValidationReport) {
    // Promote never rejects.
    validate(nodes, DanglingParentPolicy::Promote).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_ignores_case_spacing_and_trailing_punctuation() {
        assert_eq!(normalize_text("  Meeting   Goals. "), "meeting goals");
        assert_eq!(normalize_text("Budget?"), normalize_text("budget"));
        assert_ne!(normalize_text("Q3 budget"), normalize_text("Q4 budget"));
    }

    #[test]
    fn fresh_id_skips_taken_suffixes() {
        let taken: HashSet<String> = ["1", "1-1", "1-2"].iter().map(|s| s.to_string()).collect();
        assert_eq!(fresh_id("1", &taken), "1-3");
    }

    #[test]
    fn disjoint_union_keeps_forests_apart() {
        let existing = MindMap::from_nodes(vec![
            Node::new("1", "Goals"),
            Node::new("2", "Hiring").with_parent("1"),
        ]);
        let new_nodes = vec![
            Node::new("1", "Launch"),
            Node::new("3", "Press").with_parent("1"),
            Node::new("4", "Stray").with_parent("2"),
        ];

        let (map, renamed) = disjoint_union(&existing, &new_nodes);

        assert_eq!(renamed, vec![("1".to_string(), "1-1".to_string())]);
        assert_eq!(map.len(), 5);
        assert_eq!(map.get("1").unwrap().text, "Goals");
        assert_eq!(map.get("1-1").unwrap().text, "Launch");
        assert_eq!(map.get("3").unwrap().parent.as_deref(), Some("1-1"));
        // "2" is not in the batch, so the stray node becomes a root of the new forest.
        assert!(map.get("4").unwrap().is_root());
        assert!(map.is_well_formed());
    }
}
