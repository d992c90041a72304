//! Transcript → candidate nodes
//!
//! One backend request per extraction, carrying the whole chunk window as
//! JSON. The response goes through the parser chain; with the default
//! (non-strict) chain an unreadable response degrades to a stub map instead
//! of failing.

use crate::backend::{generate_bounded, CallPolicy, GenerativeBackend};
use crate::error::MindstreamError;
use crate::map::Chunk;
use crate::parse::{ParseOutcome, ParserChain};
use crate::prompts::extraction_prompt;
use std::sync::Arc;
use tracing::{debug, warn};

/// The result of one extraction: parsed map plus how it was parsed.
pub type Extraction = ParseOutcome;

pub struct StructureExtractor {
    backend: Arc<dyn GenerativeBackend>,
    chain: ParserChain,
    policy: CallPolicy,
}

impl StructureExtractor {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self {
            backend,
            chain: ParserChain::default(),
            policy: CallPolicy::default(),
        }
    }

    pub fn with_chain(mut self, chain: ParserChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.chain.is_strict()
    }

    /// Derive a map from `chunks` with a single (bounded) backend call.
    pub async fn extract(&self, chunks: &[Chunk]) -> Result<Extraction, MindstreamError> {
        let transcript = serde_json::to_string(chunks)
            .map_err(|e| MindstreamError::InvalidInput(format!("chunks not serializable: {}", e)))?;
        let prompt = extraction_prompt(&transcript);

        let text = generate_bounded(self.backend.as_ref(), &prompt, &self.policy).await?;
        let outcome = self.chain.parse(&text)?;

        if outcome.is_stub() {
            warn!(chunks = chunks.len(), "extraction output unreadable, returning stub map");
        } else {
            debug!(
                chunks = chunks.len(),
                nodes = outcome.map.len(),
                strategy = %outcome.strategy,
                "extracted structure"
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, MockBackend};
    use crate::map::DanglingParentPolicy;
    use crate::parse::{ParseError, StrategyKind};
    use crate::prompts::TRANSCRIPT_LABEL;

    fn chunks() -> Vec<Chunk> {
        vec![
            Chunk::new(0.0, 5.0, "Let's talk about the budget"),
            Chunk::new(5.0, 9.0, "and then hiring"),
        ]
    }

    #[tokio::test]
    async fn sends_whole_window_in_one_call() {
        let backend = Arc::new(
            MockBackend::available()
                .otherwise(r#"{"nodes":[{"id":"1","text":"Budget","parent":null}]}"#),
        );
        let extractor = StructureExtractor::new(backend.clone());

        let outcome = extractor.extract(&chunks()).await.unwrap();

        assert_eq!(outcome.strategy, StrategyKind::Direct);
        assert_eq!(backend.call_count(), 1);
        let prompt = &backend.prompts()[0];
        assert!(prompt.contains(TRANSCRIPT_LABEL));
        assert!(prompt.contains("Let's talk about the budget"));
        assert!(prompt.contains("and then hiring"));
    }

    #[tokio::test]
    async fn backend_failure_is_unavailable() {
        let extractor = StructureExtractor::new(Arc::new(MockBackend::unavailable()));
        let err = extractor.extract(&chunks()).await.unwrap_err();
        assert!(matches!(
            err,
            MindstreamError::BackendUnavailable(BackendError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn unreadable_output_becomes_stub() {
        let extractor = StructureExtractor::new(Arc::new(
            MockBackend::available().otherwise("I could not find any topics."),
        ));
        let outcome = extractor.extract(&chunks()).await.unwrap();
        assert!(outcome.is_stub());
        assert_eq!(outcome.map.len(), 1);
    }

    #[tokio::test]
    async fn strict_mode_surfaces_malformed_output() {
        let extractor = StructureExtractor::new(Arc::new(
            MockBackend::available().otherwise("I could not find any topics."),
        ))
        .with_chain(ParserChain::strict(DanglingParentPolicy::Promote));

        assert!(extractor.is_strict());
        let err = extractor.extract(&chunks()).await.unwrap_err();
        assert!(matches!(
            err,
            MindstreamError::MalformedOutput(ParseError::Exhausted(_))
        ));
    }
}
