//! Backend-delegated merge

use super::{disjoint_union, reconcile, settle, MergeOutcome, TreeMerger};
use crate::backend::{generate_bounded, CallPolicy, GenerativeBackend};
use crate::error::MindstreamError;
use crate::map::{DanglingParentPolicy, MindMap, Node};
use crate::parse::{ParseError, ParserChain};
use crate::prompts::merge_prompt;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Asks the backend to merge, then enforces the merge guarantees locally.
///
/// The answer is parsed with a strict chain: a stub map is never an
/// acceptable merge result. Unreadable answers fall back to the disjoint
/// union of both inputs, or fail with `MalformedOutput` in strict mode.
pub struct BackendMerger {
    backend: Arc<dyn GenerativeBackend>,
    chain: ParserChain,
    policy: CallPolicy,
    strict: bool,
}

impl BackendMerger {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self {
            backend,
            chain: ParserChain::strict(DanglingParentPolicy::default()),
            policy: CallPolicy::default(),
            strict: false,
        }
    }

    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_dangling_policy(mut self, policy: DanglingParentPolicy) -> Self {
        self.chain = ParserChain::strict(policy);
        self
    }

    /// Surface unreadable answers instead of falling back.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

#[async_trait]
impl TreeMerger for BackendMerger {
    fn id(&self) -> &str {
        "backend"
    }

    async fn merge(
        &self,
        existing: &MindMap,
        new_nodes: &[Node],
    ) -> Result<MergeOutcome, MindstreamError> {
        // Caller-supplied maps are not trusted to be well formed.
        if new_nodes.is_empty() {
            return Ok(MergeOutcome::unchanged(settle(existing.nodes.clone()).0));
        }

        let existing_json = serde_json::to_string(existing)
            .map_err(|e| MindstreamError::InvalidInput(e.to_string()))?;
        let new_json = serde_json::to_string(new_nodes)
            .map_err(|e| MindstreamError::InvalidInput(e.to_string()))?;
        let prompt = merge_prompt(&existing_json, &new_json);

        let text = generate_bounded(self.backend.as_ref(), &prompt, &self.policy).await?;

        // An empty answer to a non-empty merge would erase history.
        let parsed = self.chain.parse(&text).and_then(|outcome| {
            if outcome.map.is_empty() {
                Err(ParseError::NoNodes)
            } else {
                Ok(outcome)
            }
        });

        match parsed {
            Ok(outcome) => {
                let (map, log) = reconcile(existing, new_nodes, outcome.map);
                debug!(
                    strategy = %outcome.strategy,
                    nodes = map.len(),
                    renamed = log.renamed.len(),
                    restored = log.restored.len(),
                    collapsed = log.collapsed.len(),
                    "merged via backend"
                );
                Ok(MergeOutcome {
                    map,
                    strategy: Some(outcome.strategy),
                    fell_back: false,
                    renamed: log.renamed,
                    restored: log.restored,
                    collapsed: log.collapsed,
                })
            }
            Err(e) if self.strict => Err(e.into()),
            Err(e) => {
                warn!(error = %e, "merge output unreadable, returning disjoint union");
                let (map, renamed) = disjoint_union(existing, new_nodes);
                Ok(MergeOutcome {
                    map,
                    fell_back: true,
                    renamed,
                    ..MergeOutcome::unchanged(MindMap::new())
                })
            }
        }
    }
}
