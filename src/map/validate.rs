//! Map invariant enforcement
//!
//! Every map leaving the parser chain or a merger passes through [`validate`]:
//! ids are unique, parents resolve, and the parent relation is acyclic.
//! Bad individual nodes are dropped or repaired; the rest of the map survives.

use super::node::{MindMap, Node};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// What to do with a node whose `parent` names an id not present in the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DanglingParentPolicy {
    /// Clear the parent, making the node a root
    #[default]
    Promote,
    /// Drop the node (and, transitively, any children left dangling)
    Drop,
    /// Reject the whole map
    Reject,
}

/// Why a single node was rejected or repaired.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("node entry is not an object")]
    NotAnObject,
    #[error("node has no id")]
    MissingId,
    #[error("node {0} has no text")]
    MissingText(String),
    #[error("duplicate node id {0}")]
    DuplicateId(String),
    #[error("node {id} references missing parent {parent}")]
    DanglingParent { id: String, parent: String },
    #[error("node {0} is its own ancestor")]
    Cycle(String),
}

/// Record of what validation changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Nodes removed, with the reason
    #[serde(serialize_with = "display_all")]
    pub dropped: Vec<ValidationError>,
    /// Ids whose parent was cleared (dangling parent or cycle)
    pub promoted: Vec<String>,
}

fn display_all<S: serde::Serializer>(
    errors: &[ValidationError],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(|e| e.to_string()))
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty() && self.promoted.is_empty()
    }

    pub fn absorb(&mut self, other: ValidationReport) {
        self.dropped.extend(other.dropped);
        self.promoted.extend(other.promoted);
    }
}

/// Enforce the map invariants on `nodes`.
///
/// Order of operations: blank ids/texts and duplicate ids are dropped (first
/// occurrence wins), dangling parents are handled per `policy`, then cycles
/// are broken by promoting the node that closes each cycle. Only
/// [`DanglingParentPolicy::Reject`] can fail.
pub fn validate(
    nodes: Vec<Node>,
    policy: DanglingParentPolicy,
) -> Result<(MindMap, ValidationReport), ValidationError> {
    let mut report = ValidationReport::default();

    let mut seen: HashSet<String> = HashSet::new();
    let mut kept: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if node.id.trim().is_empty() {
            report.dropped.push(ValidationError::MissingId);
        } else if node.text.trim().is_empty() {
            report.dropped.push(ValidationError::MissingText(node.id));
        } else if !seen.insert(node.id.clone()) {
            report.dropped.push(ValidationError::DuplicateId(node.id));
        } else {
            kept.push(node);
        }
    }

    resolve_dangling(&mut kept, policy, &mut report)?;
    break_cycles(&mut kept, policy, &mut report)?;

    Ok((MindMap::from_nodes(kept), report))
}

fn resolve_dangling(
    nodes: &mut Vec<Node>,
    policy: DanglingParentPolicy,
    report: &mut ValidationReport,
) -> Result<(), ValidationError> {
    // Dropping a node can orphan its children, so iterate to a fixed point.
    loop {
        let ids: HashSet<String> = nodes.iter().map(|n| n.id.clone()).collect();
        let dangling = |n: &Node| match n.parent.as_deref() {
            Some(p) => !ids.contains(p),
            None => false,
        };

        if !nodes.iter().any(dangling) {
            return Ok(());
        }

        match policy {
            DanglingParentPolicy::Reject => {
                let node = nodes.iter().find(|n| dangling(*n));
                return Err(match node {
                    Some(n) => ValidationError::DanglingParent {
                        id: n.id.clone(),
                        parent: n.parent.clone().unwrap_or_default(),
                    },
                    None => ValidationError::MissingId,
                });
            }
            DanglingParentPolicy::Promote => {
                for node in nodes.iter_mut() {
                    if dangling(&*node) {
                        node.parent = None;
                        report.promoted.push(node.id.clone());
                    }
                }
                return Ok(());
            }
            DanglingParentPolicy::Drop => {
                let mut survivors = Vec::with_capacity(nodes.len());
                for node in nodes.drain(..) {
                    if dangling(&node) {
                        report.dropped.push(ValidationError::DanglingParent {
                            parent: node.parent.clone().unwrap_or_default(),
                            id: node.id,
                        });
                    } else {
                        survivors.push(node);
                    }
                }
                *nodes = survivors;
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

fn break_cycles(
    nodes: &mut [Node],
    policy: DanglingParentPolicy,
    report: &mut ValidationReport,
) -> Result<(), ValidationError> {
    let index: HashMap<String, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.clone(), i))
        .collect();
    let mut marks = vec![Mark::Unvisited; nodes.len()];

    for start in 0..nodes.len() {
        let mut path: Vec<usize> = Vec::new();
        let mut current = Some(start);

        while let Some(i) = current {
            match marks[i] {
                Mark::Done => break,
                Mark::OnPath => {
                    // The last node on the path points back into it: cut that link.
                    if let Some(&last) = path.last() {
                        if policy == DanglingParentPolicy::Reject {
                            return Err(ValidationError::Cycle(nodes[last].id.clone()));
                        }
                        nodes[last].parent = None;
                        report.promoted.push(nodes[last].id.clone());
                    }
                    break;
                }
                Mark::Unvisited => {
                    marks[i] = Mark::OnPath;
                    path.push(i);
                    current = nodes[i]
                        .parent
                        .as_ref()
                        .and_then(|p| index.get(p))
                        .copied();
                }
            }
        }

        for i in path {
            marks[i] = Mark::Done;
        }
    }

    Ok(())
}

/// List every invariant the map currently violates, without repairing anything.
pub fn violations(map: &MindMap) -> Vec<ValidationError> {
    let mut found = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for node in &map.nodes {
        if !seen.insert(node.id.as_str()) {
            found.push(ValidationError::DuplicateId(node.id.clone()));
        }
    }

    let parents: HashMap<&str, Option<&str>> = map
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n.parent.as_deref()))
        .collect();

    for node in &map.nodes {
        if let Some(p) = node.parent.as_deref() {
            if !parents.contains_key(p) {
                found.push(ValidationError::DanglingParent {
                    id: node.id.clone(),
                    parent: p.to_string(),
                });
                continue;
            }
        }

        // A walk longer than len() is a tail feeding some other cycle, which
        // gets reported on its own members.
        let mut current = node.parent.as_deref();
        let mut steps = 0;
        while let Some(p) = current {
            if p == node.id {
                found.push(ValidationError::Cycle(node.id.clone()));
                break;
            }
            if steps > map.nodes.len() {
                break;
            }
            steps += 1;
            current = parents.get(p).copied().flatten();
        }
    }

    found
}

impl MindMap {
    /// True if ids are unique, parents resolve, and there are no cycles.
    pub fn is_well_formed(&self) -> bool {
        violations(self).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(map: &MindMap) -> Vec<&str> {
        map.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let (map, report) = validate(
            vec![Node::new("1", "first"), Node::new("1", "second"), Node::new("2", "other")],
            DanglingParentPolicy::Promote,
        )
        .unwrap();

        assert_eq!(ids(&map), vec!["1", "2"]);
        assert_eq!(map.get("1").unwrap().text, "first");
        assert_eq!(report.dropped, vec![ValidationError::DuplicateId("1".into())]);
    }

    #[test]
    fn blank_fields_are_dropped() {
        let (map, report) = validate(
            vec![Node::new("", "no id"), Node::new("2", "   "), Node::new("3", "ok")],
            DanglingParentPolicy::Promote,
        )
        .unwrap();

        assert_eq!(ids(&map), vec!["3"]);
        assert_eq!(report.dropped.len(), 2);
    }

    #[test]
    fn dangling_parent_promoted_by_default() {
        let (map, report) = validate(
            vec![Node::new("1", "root"), Node::new("2", "orphan").with_parent("99")],
            DanglingParentPolicy::default(),
        )
        .unwrap();

        assert!(map.get("2").unwrap().is_root());
        assert_eq!(report.promoted, vec!["2".to_string()]);
        assert!(map.is_well_formed());
    }

    #[test]
    fn dangling_parent_drop_cascades() {
        let (map, report) = validate(
            vec![
                Node::new("1", "root"),
                Node::new("2", "orphan").with_parent("99"),
                Node::new("3", "grandchild").with_parent("2"),
            ],
            DanglingParentPolicy::Drop,
        )
        .unwrap();

        assert_eq!(ids(&map), vec!["1"]);
        assert_eq!(report.dropped.len(), 2);
    }

    #[test]
    fn dangling_parent_reject_fails() {
        let err = validate(
            vec![Node::new("2", "orphan").with_parent("99")],
            DanglingParentPolicy::Reject,
        )
        .unwrap_err();

        assert_eq!(
            err,
            ValidationError::DanglingParent {
                id: "2".into(),
                parent: "99".into()
            }
        );
    }

    #[test]
    fn self_parent_is_promoted() {
        let (map, report) = validate(
            vec![Node::new("1", "loop").with_parent("1")],
            DanglingParentPolicy::Promote,
        )
        .unwrap();

        assert!(map.get("1").unwrap().is_root());
        assert_eq!(report.promoted, vec!["1".to_string()]);
    }

    #[test]
    fn longer_cycle_is_broken_once() {
        let (map, report) = validate(
            vec![
                Node::new("a", "A").with_parent("c"),
                Node::new("b", "B").with_parent("a"),
                Node::new("c", "C").with_parent("b"),
                Node::new("d", "D").with_parent("a"),
            ],
            DanglingParentPolicy::Promote,
        )
        .unwrap();

        assert_eq!(report.promoted.len(), 1);
        assert_eq!(map.roots().count(), 1);
        assert!(map.is_well_formed());
    }

    #[test]
    fn violations_reports_each_problem() {
        let map = MindMap::from_nodes(vec![
            Node::new("1", "x"),
            Node::new("1", "y"),
            Node::new("2", "z").with_parent("missing"),
            Node::new("3", "w").with_parent("3"),
        ]);

        let found = violations(&map);
        assert!(found.contains(&ValidationError::DuplicateId("1".into())));
        assert!(found.contains(&ValidationError::Cycle("3".into())));
        assert!(found
            .iter()
            .any(|e| matches!(e, ValidationError::DanglingParent { id, .. } if id == "2")));
    }
}
