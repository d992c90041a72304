//! Tool orchestrator: recall → extract → merge → persist
//!
//! Executes a sequence of the four pipeline steps against one session and
//! records every invocation in a call trace. The sequence is either fixed or
//! chosen by a [`Planner`]; any order, repetition or omission of steps runs
//! correctly.
//!
//! Run-local state:
//! - the working map, which starts as the session's cached map and is
//!   replaced by Recall and by each Merge
//! - the pending extraction, set by Extract and consumed by Merge
//!
//! Merge merges the plan-supplied nodes if the step carries any, else the
//! pending extraction, else nothing. Persist writes the working map, folding
//! in any unmerged extraction as a disjoint forest. The store is only ever
//! written by Persist, with a single `set`.
//!
//! A failing step ends the run with a [`PipelineFailure`] carrying the error
//! and the trace up to and including that step. Cancellation is checked
//! before every step.

mod cancel;
mod plan;
mod trace;

pub use cancel::CancellationToken;
pub use plan::{
    parse_plan, BackendPlanner, Plan, PlanError, PlanRequest, PlannedStep, Planner, StaticPlanner,
    Step,
};
pub use trace::TraceEntry;

use crate::error::MindstreamError;
use crate::extract::StructureExtractor;
use crate::map::{Chunk, MindMap, Node};
use crate::memory::SessionStore;
use crate::merge::{disjoint_union, TreeMerger};
use crate::parse::StrategyKind;
use schemars::JsonSchema;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How the step sequence is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// Recall → Extract → Merge → Persist, once each
    #[default]
    Fixed,
    /// Whatever the configured planner returns
    Planned,
}

/// Inputs for one run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub session_id: String,
    /// The chunk window to extract from
    pub chunks: Vec<Chunk>,
    /// The session's last known map (initial working map)
    pub cached_map: MindMap,
}

/// A completed run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub run_id: String,
    pub session_id: String,
    pub map: MindMap,
    pub trace: Vec<TraceEntry>,
    pub steps: Vec<Step>,
    /// True if a Persist step ran
    pub persisted: bool,
    /// Parse strategy of the last extraction, if any ran
    pub extraction_strategy: Option<StrategyKind>,
    /// True if any merge fell back to the disjoint union
    pub merge_fell_back: bool,
    /// Why the fixed sequence was used in planned mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_fallback: Option<String>,
}

/// A run that stopped at a failing step (or was cancelled).
#[derive(Debug)]
pub struct PipelineFailure {
    pub run_id: String,
    pub error: MindstreamError,
    /// The step that failed; `None` when cancelled between steps
    pub failed_step: Option<Step>,
    /// Everything invoked up to and including the failed step
    pub trace: Vec<TraceEntry>,
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failed_step {
            Some(step) => write!(f, "pipeline failed at {}: {}", step, self.error),
            None => write!(f, "pipeline stopped: {}", self.error),
        }
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl Serialize for PipelineFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("PipelineFailure", 5)?;
        s.serialize_field("run_id", &self.run_id)?;
        s.serialize_field("error", &self.error.to_string())?;
        s.serialize_field("kind", self.error.kind())?;
        s.serialize_field("failed_step", &self.failed_step)?;
        s.serialize_field("trace", &self.trace)?;
        s.end()
    }
}

#[derive(Default)]
struct RunState {
    working: MindMap,
    pending: Option<Vec<Node>>,
    trace: Vec<TraceEntry>,
    steps: Vec<Step>,
    persisted: bool,
    extraction_strategy: Option<StrategyKind>,
    merge_fell_back: bool,
}

impl RunState {
    /// The working map with any unmerged extraction alongside it.
    fn current_map(&self) -> MindMap {
        match &self.pending {
            Some(nodes) if !nodes.is_empty() => disjoint_union(&self.working, nodes).0,
            _ => self.working.clone(),
        }
    }
}

pub struct ToolOrchestrator {
    store: Arc<dyn SessionStore>,
    extractor: Arc<StructureExtractor>,
    merger: Arc<dyn TreeMerger>,
    planner: Option<Arc<dyn Planner>>,
}

impl ToolOrchestrator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        extractor: Arc<StructureExtractor>,
        merger: Arc<dyn TreeMerger>,
    ) -> Self {
        Self {
            store,
            extractor,
            merger,
            planner: None,
        }
    }

    pub fn with_planner(mut self, planner: Arc<dyn Planner>) -> Self {
        self.planner = Some(planner);
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Execute one run. Never panics on step failure; see [`PipelineFailure`].
    pub async fn run(
        &self,
        ctx: RunContext,
        mode: PipelineMode,
        cancel: &CancellationToken,
    ) -> Result<PipelineRun, PipelineFailure> {
        let run_id = Uuid::new_v4().to_string();
        let (plan, plan_fallback) = self.resolve_plan(&ctx, mode).await;
        info!(
            run = %run_id,
            session = %ctx.session_id,
            steps = plan.len(),
            chunks = ctx.chunks.len(),
            "pipeline run started"
        );

        let mut state = RunState {
            working: ctx.cached_map.clone(),
            ..RunState::default()
        };

        for planned in &plan.steps {
            if cancel.is_cancelled() {
                warn!(run = %run_id, completed = state.steps.len(), "pipeline run cancelled");
                return Err(PipelineFailure {
                    run_id,
                    error: MindstreamError::Cancelled,
                    failed_step: None,
                    trace: state.trace,
                });
            }

            let step = planned.step;
            state
                .trace
                .push(TraceEntry::new(step.tool_name(), self.step_args(planned, &ctx, &state)));
            state.steps.push(step);

            if let Err(error) = self.execute(planned, &ctx, &mut state).await {
                warn!(run = %run_id, step = %step, error = %error, "pipeline step failed");
                return Err(PipelineFailure {
                    run_id,
                    error,
                    failed_step: Some(step),
                    trace: state.trace,
                });
            }
        }

        let map = state.current_map();
        info!(
            run = %run_id,
            session = %ctx.session_id,
            nodes = map.len(),
            persisted = state.persisted,
            "pipeline run finished"
        );

        Ok(PipelineRun {
            run_id,
            session_id: ctx.session_id,
            map,
            trace: state.trace,
            steps: state.steps,
            persisted: state.persisted,
            extraction_strategy: state.extraction_strategy,
            merge_fell_back: state.merge_fell_back,
            plan_fallback,
        })
    }

    async fn resolve_plan(&self, ctx: &RunContext, mode: PipelineMode) -> (Plan, Option<String>) {
        if mode == PipelineMode::Fixed {
            return (Plan::fixed(), None);
        }
        let Some(planner) = &self.planner else {
            return (Plan::fixed(), Some("no planner configured".to_string()));
        };

        let request = PlanRequest {
            session_id: ctx.session_id.clone(),
            chunk_count: ctx.chunks.len(),
            prior_nodes: ctx.cached_map.len(),
        };
        match planner.plan(&request).await {
            Ok(plan) if !plan.is_empty() => (plan, None),
            Ok(_) => (Plan::fixed(), Some(PlanError::Empty.to_string())),
            Err(e) => {
                warn!(session = %ctx.session_id, error = %e, "planner failed, using fixed sequence");
                (Plan::fixed(), Some(e.to_string()))
            }
        }
    }

    fn step_args(&self, planned: &PlannedStep, ctx: &RunContext, state: &RunState) -> serde_json::Value {
        match planned.step {
            Step::Recall => json!({ "session_id": ctx.session_id }),
            Step::Extract => json!({ "chunks": ctx.chunks.len() }),
            Step::Merge => {
                let (source, count) = match (&planned.new_nodes, &state.pending) {
                    (Some(nodes), _) => ("plan", nodes.len()),
                    (None, Some(nodes)) => ("extraction", nodes.len()),
                    (None, None) => ("none", 0),
                };
                json!({
                    "existing_nodes": state.working.len(),
                    "new_nodes": count,
                    "source": source,
                })
            }
            Step::Persist => json!({
                "session_id": ctx.session_id,
                "nodes": state.current_map().len(),
            }),
        }
    }

    async fn execute(
        &self,
        planned: &PlannedStep,
        ctx: &RunContext,
        state: &mut RunState,
    ) -> Result<(), MindstreamError> {
        match planned.step {
            Step::Recall => {
                state.working = self.store.recall(&ctx.session_id)?;
                debug!(session = %ctx.session_id, nodes = state.working.len(), "recalled map");
            }
            Step::Extract => {
                if ctx.chunks.is_empty() {
                    debug!(session = %ctx.session_id, "empty chunk window, nothing to extract");
                    state.pending = None;
                    return Ok(());
                }
                let extraction = self.extractor.extract(&ctx.chunks).await?;
                state.extraction_strategy = Some(extraction.strategy);
                state.pending = Some(extraction.map.into_nodes());
            }
            Step::Merge => {
                let new_nodes = match &planned.new_nodes {
                    Some(nodes) => nodes.clone(),
                    None => state.pending.take().unwrap_or_default(),
                };
                let outcome = self.merger.merge(&state.working, &new_nodes).await?;
                state.merge_fell_back |= outcome.fell_back;
                state.working = outcome.map;
            }
            Step::Persist => {
                let map = state.current_map();
                self.store.set(&ctx.session_id, &map)?;
                state.working = map;
                state.pending = None;
                state.persisted = true;
                debug!(session = %ctx.session_id, nodes = state.working.len(), "persisted map");
            }
        }
        Ok(())
    }
}
