//! Shared fixtures

use mindstream::{Chunk, Config, GenerativeBackend, MindMap, MindstreamApi, SessionStore};
use std::sync::Arc;

pub fn chunk(text: &str) -> Chunk {
    Chunk::new(0.0, 1.0, text)
}

/// Defaults, but merging locally and never planning via the backend.
pub fn heuristic_config() -> Config {
    let mut config = Config::default();
    config.merge.strategy = mindstream::config::MergeStrategy::Heuristic;
    config.planner.enabled = false;
    config
}

pub fn api_over(
    backend: Arc<dyn GenerativeBackend>,
    store: Arc<dyn SessionStore>,
    config: &Config,
) -> MindstreamApi {
    MindstreamApi::new(backend, store, config)
}

/// `{"nodes": [...]}` from `(id, text, parent)` triples.
pub fn nodes_json(nodes: &[(&str, &str, Option<&str>)]) -> String {
    let nodes: Vec<serde_json::Value> = nodes
        .iter()
        .map(|(id, text, parent)| serde_json::json!({ "id": id, "text": text, "parent": parent }))
        .collect();
    serde_json::json!({ "nodes": nodes }).to_string()
}

/// Node texts, sorted.
pub fn texts(map: &MindMap) -> Vec<String> {
    let mut texts: Vec<String> = map.nodes.iter().map(|n| n.text.clone()).collect();
    texts.sort();
    texts
}
