//! Outline nodes and the map they form

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Canvas position hint, passed through untouched
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// One outline entry.
///
/// `parent` is always serialized (as `null` for roots); the remaining optional
/// fields are omitted when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Node {
    /// Opaque id, unique within one map
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Relative weight (1-5 by convention)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
}

impl Node {
    /// Create a root node
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            parent: None,
            position: None,
            importance: None,
            node_type: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_importance(mut self, importance: i64) -> Self {
        self.importance = Some(importance);
        self
    }

    pub fn with_node_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position { x, y });
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// A forest of nodes: the current outline for a session.
///
/// Wire shape: `{"nodes": [{"id": "..", "text": "..", "parent": ".."|null}, ..]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MindMap {
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl MindMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap nodes as-is. Callers that need the invariants enforced go
    /// through [`crate::map::validate`].
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn ids(&self) -> HashSet<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    pub fn roots(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_root())
    }

    pub fn children_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes
            .iter()
            .filter(move |n| n.parent.as_deref() == Some(id))
    }

    pub fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    /// Render the forest as an indented `- text` outline.
    ///
    /// Nodes whose parent does not resolve are rendered as roots. Each node
    /// is emitted at most once, so a cyclic (unvalidated) map still terminates.
    pub fn to_outline(&self) -> String {
        let ids = self.ids();
        let mut children: HashMap<&str, Vec<&Node>> = HashMap::new();
        let mut tops = Vec::new();
        for node in &self.nodes {
            match node.parent.as_deref() {
                Some(p) if ids.contains(p) && p != node.id => {
                    children.entry(p).or_default().push(node)
                }
                _ => tops.push(node),
            }
        }

        let mut out = String::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut stack: Vec<(&Node, usize)> = tops.into_iter().rev().map(|n| (n, 0)).collect();
        while let Some((node, depth)) = stack.pop() {
            if !seen.insert(node.id.as_str()) {
                continue;
            }
            out.push_str(&"  ".repeat(depth));
            out.push_str("- ");
            out.push_str(&node.text);
            out.push('\n');
            if let Some(kids) = children.get(node.id.as_str()) {
                for kid in kids.iter().rev() {
                    stack.push((*kid, depth + 1));
                }
            }
        }
        out
    }
}
