//! Transport-independent API layer.
//!
//! `MindstreamApi` is the single entry point for consumer-facing operations.
//! The MCP server and the CLI call these methods; they never reach into the
//! orchestrator, the session registry or the store directly.

use std::sync::Arc;

use crate::backend::GenerativeBackend;
use crate::config::{Config, MergeStrategy};
use crate::error::MindstreamError;
use crate::extract::{Extraction, StructureExtractor};
use crate::map::{Chunk, MindMap, Node};
use crate::memory::SessionStore;
use crate::merge::{BackendMerger, HeuristicMerger, MergeOutcome, TreeMerger};
use crate::orchestrator::{
    BackendPlanner, CancellationToken, PipelineFailure, PipelineMode, PipelineRun, RunContext,
    ToolOrchestrator,
};
use crate::parse::ParserChain;
use crate::session::SessionRegistry;

/// Single entry point for all consumer-facing operations.
#[derive(Clone)]
pub struct MindstreamApi {
    registry: Arc<SessionRegistry>,
    orchestrator: Arc<ToolOrchestrator>,
    extractor: Arc<StructureExtractor>,
    merger: Arc<dyn TreeMerger>,
    store: Arc<dyn SessionStore>,
}

impl MindstreamApi {
    /// Wire the pipeline from configuration.
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        store: Arc<dyn SessionStore>,
        config: &Config,
    ) -> Self {
        let policy = config.backend.call_policy();
        let dangling = config.parser.dangling_parent;

        let chain = if config.parser.strict {
            ParserChain::strict(dangling)
        } else {
            ParserChain::new(dangling)
        };
        let extractor = Arc::new(
            StructureExtractor::new(backend.clone())
                .with_chain(chain)
                .with_policy(policy),
        );

        let merger: Arc<dyn TreeMerger> = match config.merge.strategy {
            MergeStrategy::Backend => Arc::new(
                BackendMerger::new(backend.clone())
                    .with_policy(policy)
                    .with_dangling_policy(dangling)
                    .strict(config.merge.strict),
            ),
            MergeStrategy::Heuristic => Arc::new(HeuristicMerger),
        };

        let mut orchestrator = ToolOrchestrator::new(store.clone(), extractor.clone(), merger.clone());
        if config.planner.enabled {
            orchestrator =
                orchestrator.with_planner(Arc::new(BackendPlanner::new(backend).with_policy(policy)));
        }

        Self {
            registry: Arc::new(SessionRegistry::new(config.buffer.max_chunks)),
            orchestrator: Arc::new(orchestrator),
            extractor,
            merger,
            store,
        }
    }

    /// Wire the API around an already-built orchestrator.
    pub fn from_parts(
        registry: SessionRegistry,
        orchestrator: ToolOrchestrator,
        extractor: Arc<StructureExtractor>,
        merger: Arc<dyn TreeMerger>,
    ) -> Self {
        let store = orchestrator.store().clone();
        Self {
            registry: Arc::new(registry),
            orchestrator: Arc::new(orchestrator),
            extractor,
            merger,
            store,
        }
    }

    // --- Stateless ---

    /// Derive a map from chunks. Touches no session.
    pub async fn extract(&self, chunks: &[Chunk]) -> Result<MindMap, MindstreamError> {
        Ok(self.extractor.extract(chunks).await?.map)
    }

    /// Like [`extract`](Self::extract), with the parse outcome.
    pub async fn extract_detailed(&self, chunks: &[Chunk]) -> Result<Extraction, MindstreamError> {
        self.extractor.extract(chunks).await
    }

    /// Merge new nodes into a map. Touches no session.
    pub async fn merge(
        &self,
        existing: &MindMap,
        new_nodes: &[Node],
    ) -> Result<MindMap, MindstreamError> {
        Ok(self.merger.merge(existing, new_nodes).await?.map)
    }

    pub async fn merge_detailed(
        &self,
        existing: &MindMap,
        new_nodes: &[Node],
    ) -> Result<MergeOutcome, MindstreamError> {
        self.merger.merge(existing, new_nodes).await
    }

    // --- Sessions ---

    /// Buffer chunks for a session without running the pipeline.
    /// Returns the window length afterwards.
    pub async fn ingest(&self, session_id: &str, chunks: Vec<Chunk>) -> usize {
        let mut session = self.registry.lock(session_id).await;
        session.buffer_mut().add(chunks);
        session.buffer().len()
    }

    /// Buffer chunks, then run the pipeline over the session's window.
    pub async fn run_pipeline(
        &self,
        session_id: &str,
        chunks: Vec<Chunk>,
        mode: PipelineMode,
    ) -> Result<PipelineRun, PipelineFailure> {
        self.run_pipeline_cancellable(session_id, chunks, mode, &CancellationToken::new())
            .await
    }

    /// [`run_pipeline`](Self::run_pipeline) with a caller-held cancellation token.
    ///
    /// The session lock is held from buffering through the end of the run.
    pub async fn run_pipeline_cancellable(
        &self,
        session_id: &str,
        chunks: Vec<Chunk>,
        mode: PipelineMode,
        cancel: &CancellationToken,
    ) -> Result<PipelineRun, PipelineFailure> {
        let mut session = self.registry.lock(session_id).await;
        session.buffer_mut().add(chunks);

        let ctx = RunContext {
            session_id: session_id.to_string(),
            chunks: session.buffer().get_recent().to_vec(),
            cached_map: session.buffer().get_map().clone(),
        };

        let result = self.orchestrator.run(ctx, mode, cancel).await;
        if let Ok(run) = &result {
            if run.persisted {
                session.buffer_mut().update_map(run.map.clone());
            }
        }
        result
    }

    /// The session's last persisted map (empty if never persisted).
    pub fn session_map(&self, session_id: &str) -> Result<MindMap, MindstreamError> {
        Ok(self.store.recall(session_id)?)
    }

    /// The chunks currently buffered for a session.
    pub async fn session_window(&self, session_id: &str) -> Vec<Chunk> {
        self.registry.lock(session_id).await.buffer().get_recent().to_vec()
    }

    /// Sessions with a persisted map.
    pub fn list_sessions(&self) -> Result<Vec<String>, MindstreamError> {
        Ok(self.store.list_sessions()?)
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }
}
