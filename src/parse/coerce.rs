//! Lenient conversion of decoded JSON values into nodes
//!
//! Backends drift from the requested shape: numeric ids, `label` instead of
//! `text`, `"None"` as a parent, a top-level `result` key. These helpers accept
//! the common drifts and reject the rest per node.

use super::{Candidates, ParseError};
use crate::map::{Node, Position, ValidationError};
use serde_json::{Map, Value};

const TEXT_KEYS: &[&str] = &["text", "label", "name", "title"];
const PARENT_KEYS: &[&str] = &["parent", "parent_id"];
const NULL_TOKENS: &[&str] = &["null", "none", "nil"];

/// Pull the node list out of a decoded value.
///
/// Accepts `{"nodes": [..]}`, `{"result": [..]}` and a bare array.
pub(crate) fn nodes_from_value(value: Value) -> Result<Candidates, ParseError> {
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut obj) => match obj.remove("nodes").or_else(|| obj.remove("result")) {
            Some(Value::Array(entries)) => entries,
            Some(Value::Object(inner)) => return nodes_from_value(Value::Object(inner)),
            _ => return Err(ParseError::NoNodes),
        },
        _ => return Err(ParseError::NoNodes),
    };

    let mut candidates = Candidates::default();
    for entry in entries {
        match node_from_value(entry) {
            Ok(node) => candidates.nodes.push(node),
            Err(e) => candidates.rejected.push(e),
        }
    }
    Ok(candidates)
}

pub(crate) fn node_from_value(value: Value) -> Result<Node, ValidationError> {
    let obj = match value {
        Value::Object(obj) => obj,
        _ => return Err(ValidationError::NotAnObject),
    };

    let id = obj
        .get("id")
        .and_then(scalar_string)
        .ok_or(ValidationError::MissingId)?;

    let text = TEXT_KEYS
        .iter()
        .find_map(|k| obj.get(*k).and_then(scalar_string))
        .ok_or_else(|| ValidationError::MissingText(id.clone()))?;

    let mut node = Node::new(id, text);
    node.parent = parent_of(&obj);
    node.importance = obj.get("importance").and_then(integer);
    node.node_type = ["node_type", "type"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(scalar_string));
    node.position = obj.get("position").and_then(position);
    Ok(node)
}

/// Strings pass through trimmed; numbers and booleans are stringified.
fn scalar_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn parent_of(obj: &Map<String, Value>) -> Option<String> {
    let raw = PARENT_KEYS.iter().find_map(|k| obj.get(*k))?;
    let parent = scalar_string(raw)?;
    if NULL_TOKENS.contains(&parent.to_lowercase().as_str()) {
        None
    } else {
        Some(parent)
    }
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    }
}

fn position(value: &Value) -> Option<Position> {
    let x = value.get("x")?.as_f64()?;
    let y = value.get("y")?.as_f64()?;
    Some(Position { x, y })
}
