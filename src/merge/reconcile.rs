//! Repair a backend-produced merge against the merge guarantees
//!
//! The backend is asked to keep existing nodes intact, but nothing enforces
//! that. [`reconcile`] takes its (already parsed) answer and applies, in order:
//!
//! 1. id collisions: a node reusing an existing id for different text is
//!    re-namespaced, and its non-existing children move with it
//! 2. id stability: a new-id node whose text matches a missing existing node
//!    takes over that node's id and text
//! 3. existing ids are authoritative: every node carrying one is reset to the
//!    stored node, so the backend can place new nodes but not move or reword
//!    old ones
//! 4. additivity: missing existing nodes are put back, unless a new node with
//!    the same text stands in for them
//! 5. sibling duplicates: same parent and same text, at least one of them
//!    new, are collapsed onto the pre-existing one (or the first)
//! 6. a final invariant pass

use super::{fresh_id, normalize_text, settle};
use crate::map::{MindMap, Node};
use std::collections::{HashMap, HashSet};

/// What reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileLog {
    pub renamed: Vec<(String, String)>,
    pub restored: Vec<String>,
    pub collapsed: Vec<String>,
}

fn reparent(nodes: &mut [Node], from: &str, to: &str, skip: impl Fn(&Node) -> bool) {
    for node in nodes.iter_mut() {
        if node.parent.as_deref() == Some(from) && !skip(node) {
            node.parent = Some(to.to_string());
        }
    }
}

pub fn reconcile(existing: &MindMap, new_nodes: &[Node], merged: MindMap) -> (MindMap, ReconcileLog) {
    let mut log = ReconcileLog::default();
    let existing_by_id: HashMap<&str, &Node> =
        existing.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let is_existing = |n: &Node| existing_by_id.contains_key(n.id.as_str());
    let mut nodes = merged.into_nodes();

    // 1. collisions
    let mut taken: HashSet<String> = existing.nodes.iter().map(|n| n.id.clone()).collect();
    taken.extend(nodes.iter().map(|n| n.id.clone()));
    for i in 0..nodes.len() {
        let Some(prev) = existing_by_id.get(nodes[i].id.as_str()) else {
            continue;
        };
        if normalize_text(&prev.text) == normalize_text(&nodes[i].text) {
            continue;
        }
        let old = nodes[i].id.clone();
        let id = fresh_id(&old, &taken);
        taken.insert(id.clone());
        nodes[i].id = id.clone();
        reparent(&mut nodes, &old, &id, |n| is_existing(n) || n.id == id);
        log.renamed.push((old, id));
    }

    // 2. id stability
    let present: HashSet<String> = nodes.iter().map(|n| n.id.clone()).collect();
    let mut missing_by_text: HashMap<String, &Node> = HashMap::new();
    for node in existing.nodes.iter().filter(|n| !present.contains(&n.id)) {
        missing_by_text.entry(normalize_text(&node.text)).or_insert(node);
    }
    for i in 0..nodes.len() {
        if is_existing(&nodes[i]) {
            continue;
        }
        if let Some(target) = missing_by_text.remove(&normalize_text(&nodes[i].text)) {
            let old = std::mem::replace(&mut nodes[i].id, target.id.clone());
            reparent(&mut nodes, &old, &target.id, |_| false);
        }
    }

    // 3. stored nodes win
    for node in nodes.iter_mut() {
        if let Some(stored) = existing_by_id.get(node.id.as_str()) {
            *node = (*stored).clone();
        }
    }

    // 4. additivity
    let present: HashSet<String> = nodes.iter().map(|n| n.id.clone()).collect();
    let present_texts: HashSet<String> = nodes.iter().map(|n| normalize_text(&n.text)).collect();
    let new_texts: HashSet<String> = new_nodes.iter().map(|n| normalize_text(&n.text)).collect();
    for node in &existing.nodes {
        if present.contains(&node.id) {
            continue;
        }
        let key = normalize_text(&node.text);
        if new_texts.contains(&key) && present_texts.contains(&key) {
            continue;
        }
        nodes.push(node.clone());
        log.restored.push(node.id.clone());
    }

    // 5. sibling duplicates; one collapse per pass since reparenting can
    // create new sibling pairs under the survivor
    loop {
        let mut first: HashMap<(Option<String>, String), usize> = HashMap::new();
        let mut collapse: Option<(usize, usize)> = None;
        for (i, node) in nodes.iter().enumerate() {
            let key = (node.parent.clone(), normalize_text(&node.text));
            match first.get(&key) {
                None => {
                    first.insert(key, i);
                }
                Some(&j) => {
                    let (i_old, j_old) = (is_existing(node), is_existing(&nodes[j]));
                    if i_old && j_old {
                        continue;
                    }
                    collapse = Some(if i_old { (j, i) } else { (i, j) });
                    break;
                }
            }
        }

        let Some((drop, keep)) = collapse else { break };
        let keep_id = nodes[keep].id.clone();
        let dropped = nodes.remove(drop);
        reparent(&mut nodes, &dropped.id, &keep_id, |_| false);
        log.collapsed.push(dropped.id);
    }

    (settle(nodes).0, log)
}
