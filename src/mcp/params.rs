//! MCP tool parameter structs with schemars-derived JSON schemas.

use crate::map::{Chunk, MindMap, Node};
use crate::orchestrator::PipelineMode;
use schemars::JsonSchema;
use serde::Deserialize;

// ── Stateless params ────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExtractStructureParams {
    #[schemars(description = "Transcript chunks ({start, end, text}) in arrival order")]
    pub chunks: Vec<Chunk>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MergeMapsParams {
    #[schemars(description = "The current map ({nodes: [...]})")]
    pub existing: MindMap,
    #[schemars(description = "Nodes to merge into the map")]
    pub new_nodes: Vec<Node>,
}

// ── Session params ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateMapParams {
    #[schemars(description = "Conversation session id (created on first use)")]
    pub session_id: String,
    #[schemars(description = "New transcript chunks to append to the session window")]
    pub chunks: Vec<Chunk>,
    #[schemars(description = "'fixed' (recall, extract, merge, persist) or 'planned'; defaults to fixed")]
    pub mode: Option<PipelineMode>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SessionIdParams {
    #[schemars(description = "Conversation session id")]
    pub session_id: String,
}
