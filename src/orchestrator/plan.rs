//! Step sequences and the planners that produce them

use crate::backend::{generate_bounded, BackendError, CallPolicy, GenerativeBackend};
use crate::map::Node;
use crate::parse::{nodes_from_value, strip_fences};
use crate::prompts::planning_prompt;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// The four pipeline primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Recall,
    Extract,
    Merge,
    Persist,
}

impl Step {
    /// The fixed-mode sequence
    pub const FIXED: [Step; 4] = [Step::Recall, Step::Extract, Step::Merge, Step::Persist];

    /// Name recorded in the call trace
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::Recall => "recall_map",
            Self::Extract => "extract_structure",
            Self::Merge => "merge_maps",
            Self::Persist => "persist_map",
        }
    }

    /// Resolve a tool name as a planner might spell it.
    pub fn from_tool_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().replace('-', "_").as_str() {
            "recall_map" | "recall" | "get_map" | "load_map" => Some(Self::Recall),
            "extract_structure" | "extract" | "extract_map" => Some(Self::Extract),
            "merge_maps" | "merge" | "merge_map" => Some(Self::Merge),
            "persist_map" | "persist" | "save_map" | "save" | "store_map" => Some(Self::Persist),
            _ => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_name())
    }
}

/// One step of a plan. A Merge may carry the nodes to merge explicitly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedStep {
    pub step: Step,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_nodes: Option<Vec<Node>>,
}

impl PlannedStep {
    pub fn new(step: Step) -> Self {
        Self {
            step,
            new_nodes: None,
        }
    }

    pub fn merge_with(nodes: Vec<Node>) -> Self {
        Self {
            step: Step::Merge,
            new_nodes: Some(nodes),
        }
    }
}

/// An ordered sequence of steps. Any order, repetition or omission is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Plan {
    pub steps: Vec<PlannedStep>,
}

impl Plan {
    pub fn fixed() -> Self {
        Self::from_steps(Step::FIXED)
    }

    pub fn from_steps(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: steps.into_iter().map(PlannedStep::new).collect(),
        }
    }

    pub fn then(mut self, step: PlannedStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("planner backend failed: {0}")]
    Backend(#[from] BackendError),
    #[error("plan is not a JSON list of tool calls: {0}")]
    Unparseable(String),
    #[error("unknown tool in plan: {0}")]
    UnknownTool(String),
    #[error("planner returned no steps")]
    Empty,
}

/// What a planner knows about the run it is planning.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub session_id: String,
    pub chunk_count: usize,
    pub prior_nodes: usize,
}

/// Chooses the steps for a planned-mode run.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, request: &PlanRequest) -> Result<Plan, PlanError>;
}

/// Always returns the same plan. Used for scripted runs and tests.
#[derive(Debug, Clone)]
pub struct StaticPlanner {
    plan: Plan,
}

impl StaticPlanner {
    pub fn new(plan: Plan) -> Self {
        Self { plan }
    }
}

#[async_trait]
impl Planner for StaticPlanner {
    async fn plan(&self, _request: &PlanRequest) -> Result<Plan, PlanError> {
        Ok(self.plan.clone())
    }
}

/// Asks the generative backend which tools to call.
pub struct BackendPlanner {
    backend: Arc<dyn GenerativeBackend>,
    policy: CallPolicy,
}

impl BackendPlanner {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self {
            backend,
            policy: CallPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[async_trait]
impl Planner for BackendPlanner {
    async fn plan(&self, request: &PlanRequest) -> Result<Plan, PlanError> {
        let prompt = planning_prompt(&request.session_id, request.chunk_count, request.prior_nodes);
        let text = generate_bounded(self.backend.as_ref(), &prompt, &self.policy).await?;
        parse_plan(&text)
    }
}

fn decode_plan_value(text: &str) -> Result<Value, PlanError> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }
    if let Some(body) = strip_fences(trimmed) {
        if let Ok(value) = serde_json::from_str(body) {
            return Ok(value);
        }
    }
    match (trimmed.find('['), trimmed.rfind(']')) {
        (Some(start), Some(end)) if end > start => serde_json::from_str(&trimmed[start..=end])
            .map_err(|e| PlanError::Unparseable(e.to_string())),
        _ => Err(PlanError::Unparseable("no JSON array found".to_string())),
    }
}

/// Read a plan from planner output.
///
/// Accepts a JSON array (bare, fenced, or inside prose) or an object with a
/// `steps`/`plan` array. Entries are tool names or `{"tool": .., "args": {..}}`
/// objects; `merge_maps` may carry `args.new_nodes`.
pub fn parse_plan(text: &str) -> Result<Plan, PlanError> {
    let value = decode_plan_value(text)?;
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut obj) => match obj.remove("steps").or_else(|| obj.remove("plan")) {
            Some(Value::Array(entries)) => entries,
            _ => return Err(PlanError::Unparseable("object without a steps array".to_string())),
        },
        _ => return Err(PlanError::Unparseable("expected a list of tool calls".to_string())),
    };

    let mut plan = Plan::default();
    for entry in entries {
        let (name, args) = match entry {
            Value::String(name) => (name, Value::Null),
            Value::Object(mut obj) => {
                let name = ["tool", "name", "step"]
                    .iter()
                    .find_map(|k| obj.get(*k).and_then(Value::as_str).map(str::to_string))
                    .ok_or_else(|| PlanError::Unparseable("tool call without a name".to_string()))?;
                let args = obj
                    .remove("args")
                    .or_else(|| obj.remove("arguments"))
                    .unwrap_or(Value::Null);
                (name, args)
            }
            other => return Err(PlanError::Unparseable(format!("unexpected entry {}", other))),
        };

        let step = Step::from_tool_name(&name).ok_or(PlanError::UnknownTool(name))?;
        let new_nodes = match (step, args.get("new_nodes")) {
            (Step::Merge, Some(nodes)) => nodes_from_value(nodes.clone()).ok().map(|c| c.nodes),
            _ => None,
        };
        plan.steps.push(PlannedStep { step, new_nodes });
    }

    if plan.is_empty() {
        return Err(PlanError::Empty);
    }
    Ok(plan)
}
