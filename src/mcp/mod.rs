//! MCP server for mindstream: exposes extraction, merging and the session
//! pipeline via the Model Context Protocol.
//!
//! Tools: extract_structure, merge_maps, generate_map, get_map, list_sessions.

pub mod params;

use crate::api::MindstreamApi;
use crate::backend::CommandBackend;
use crate::config::Config;
use crate::memory::{OpenStore, SqliteStore};
use params::*;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ok_text(text: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn err_text(msg: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(msg)]))
}

fn ok_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    match serde_json::to_string_pretty(value) {
        Ok(text) => ok_text(text),
        Err(e) => err_text(format!("failed to serialize result: {}", e)),
    }
}

fn err_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    match serde_json::to_string_pretty(value) {
        Ok(text) => err_text(text),
        Err(e) => err_text(format!("failed to serialize error: {}", e)),
    }
}

// ---------------------------------------------------------------------------
// MindstreamMcpServer
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MindstreamMcpServer {
    api: MindstreamApi,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl MindstreamMcpServer {
    pub fn new(api: MindstreamApi) -> Self {
        Self {
            api,
            tool_router: Self::tool_router(),
        }
    }

    // ── Stateless tools ─────────────────────────────────────────────────

    #[tool(description = "Extract mind map nodes ({id, text, parent}) from transcript chunks")]
    async fn extract_structure(
        &self,
        Parameters(p): Parameters<ExtractStructureParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.api.extract(&p.chunks).await {
            Ok(map) => ok_json(&map),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "Merge new nodes into an existing mind map without duplicating topics")]
    async fn merge_maps(
        &self,
        Parameters(p): Parameters<MergeMapsParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.api.merge(&p.existing, &p.new_nodes).await {
            Ok(map) => ok_json(&map),
            Err(e) => err_text(e.to_string()),
        }
    }

    // ── Session tools ───────────────────────────────────────────────────

    #[tool(
        description = "Append chunks to a session and run recall, extract, merge and persist; returns the map and call trace"
    )]
    async fn generate_map(
        &self,
        Parameters(p): Parameters<GenerateMapParams>,
    ) -> Result<CallToolResult, McpError> {
        if p.session_id.trim().is_empty() {
            return err_text("session_id must not be empty".to_string());
        }
        let mode = p.mode.unwrap_or_default();
        match self.api.run_pipeline(&p.session_id, p.chunks, mode).await {
            Ok(run) => ok_json(&run),
            Err(failure) => err_json(&failure),
        }
    }

    #[tool(description = "Get the last persisted map for a session (empty if none)")]
    fn get_map(
        &self,
        Parameters(p): Parameters<SessionIdParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.api.session_map(&p.session_id) {
            Ok(map) => ok_json(&map),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "List sessions that have a persisted map")]
    fn list_sessions(&self) -> Result<CallToolResult, McpError> {
        match self.api.list_sessions() {
            Ok(ids) => ok_json(&ids),
            Err(e) => err_text(e.to_string()),
        }
    }
}

#[tool_handler]
impl ServerHandler for MindstreamMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "mindstream MCP server: turns transcript chunks into a per-session mind map. \
                 Use generate_map for the full pipeline, or extract_structure then merge_maps."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run_mcp_server(config: &Config, db_path: &Path) -> i32 {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            return 1;
        }
    };

    rt.block_on(async {
        let store = match SqliteStore::open(db_path) {
            Ok(s) => Arc::new(s),
            Err(e) => {
                eprintln!("failed to open database at {}: {}", db_path.display(), e);
                return 1;
            }
        };
        let backend = match CommandBackend::from_argv(&config.backend.command) {
            Ok(b) => Arc::new(b),
            Err(e) => {
                eprintln!("{}", e);
                return 1;
            }
        };

        let server = MindstreamMcpServer::new(MindstreamApi::new(backend, store, config));

        info!(db = %db_path.display(), "mindstream mcp server starting on stdio");

        let service = match server.serve(rmcp::transport::stdio()).await {
            Ok(s) => s,
            Err(e) => {
                eprintln!("failed to start MCP server: {}", e);
                return 1;
            }
        };

        if let Err(e) = service.waiting().await {
            eprintln!("MCP server error: {}", e);
            return 1;
        }

        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::map::Chunk;
    use crate::memory::InMemoryStore;

    fn server(backend: MockBackend) -> MindstreamMcpServer {
        let mut config = Config::default();
        config.planner.enabled = false;
        MindstreamMcpServer::new(MindstreamApi::new(
            Arc::new(backend),
            Arc::new(InMemoryStore::new()),
            &config,
        ))
    }

    /// (is_error, first text block) from the result's wire form.
    fn read(result: &CallToolResult) -> (bool, String) {
        let wire = serde_json::to_value(result).unwrap();
        let is_error = wire["isError"].as_bool().unwrap_or(false);
        let text = wire["content"][0]["text"].as_str().unwrap_or_default().to_string();
        (is_error, text)
    }

    #[tokio::test]
    async fn extract_structure_returns_map_json() {
        let server = server(
            MockBackend::available().otherwise(r#"{"nodes":[{"id":"1","text":"A","parent":null}]}"#),
        );

        let result = server
            .extract_structure(Parameters(ExtractStructureParams {
                chunks: vec![Chunk::new(0.0, 1.0, "a")],
            }))
            .await
            .unwrap();

        let (is_error, text) = read(&result);
        assert!(!is_error);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["nodes"][0]["text"], "A");
    }

    #[tokio::test]
    async fn generate_map_failure_is_a_tool_error_with_trace() {
        let server = server(MockBackend::unavailable());

        let result = server
            .generate_map(Parameters(GenerateMapParams {
                session_id: "s1".to_string(),
                chunks: vec![Chunk::new(0.0, 1.0, "hello")],
                mode: None,
            }))
            .await
            .unwrap();

        let (is_error, text) = read(&result);
        assert!(is_error);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["kind"], "backend_unavailable");
        assert_eq!(value["trace"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_session_id_is_rejected() {
        let server = server(MockBackend::available());
        let result = server
            .generate_map(Parameters(GenerateMapParams {
                session_id: "  ".to_string(),
                chunks: vec![],
                mode: None,
            }))
            .await
            .unwrap();
        assert!(read(&result).0);
    }
}
