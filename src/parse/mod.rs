//! Fallback parser chain: arbitrary backend text → validated map
//!
//! Backend output is free-form. It may be clean JSON, JSON wrapped in a code
//! fence, JSON buried in prose, a Python-style literal, an indented outline,
//! or nothing usable at all. The chain tries one strategy per shape, in a
//! fixed order, and the first strategy whose nodes survive validation wins:
//!
//! 1. [`DirectDecode`]: the text is JSON
//! 2. [`FenceStrip`]: drop leading/trailing fence lines, then decode
//! 3. [`ObjectExtraction`]: smallest balanced object around a `"nodes": [` anchor
//! 4. [`LiteralNormalization`]: rewrite `'quotes'`, `None`/`True`/`False`, trailing commas
//! 5. [`OutlineParse`]: bullets, indentation, tree glyphs
//! 6. [`StubFallback`]: a single synthesized root (absent in strict chains)
//!
//! Every strategy is a pure function of the text. The outcome records which
//! one won, so callers can tell a clean decode from a stub.

mod coerce;
mod json;
mod outline;

pub(crate) use coerce::nodes_from_value;
pub(crate) use json::strip_fences;
pub use json::{DirectDecode, FenceStrip, LiteralNormalization, ObjectExtraction};
pub use outline::OutlineParse;

use crate::map::{validate, DanglingParentPolicy, MindMap, Node, ValidationError, ValidationReport};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Identifies a strategy in outcomes, traces and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Direct,
    FenceStrip,
    ObjectExtraction,
    LiteralNormalization,
    Outline,
    Stub,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Direct => "direct",
            Self::FenceStrip => "fence_strip",
            Self::ObjectExtraction => "object_extraction",
            Self::LiteralNormalization => "literal_normalization",
            Self::Outline => "outline",
            Self::Stub => "stub",
        };
        f.write_str(s)
    }
}

/// One failed strategy attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attempt {
    pub strategy: StrategyKind,
    pub error: String,
}

/// Why a strategy (or the whole chain) failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("not applicable: {0}")]
    NotApplicable(&'static str),
    #[error("invalid JSON: {0}")]
    Json(String),
    #[error("no nodes array found")]
    NoNodes,
    #[error("all {0} candidate nodes were rejected")]
    AllRejected(usize),
    #[error("map rejected: {0}")]
    Rejected(ValidationError),
    #[error("no parse strategy produced a map ({} attempted)", .0.len())]
    Exhausted(Vec<Attempt>),
}

/// Raw nodes produced by a strategy, before map validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidates {
    pub nodes: Vec<Node>,
    /// Entries dropped while coercing them into nodes
    pub rejected: Vec<ValidationError>,
}

/// A single way of reading nodes out of text.
pub trait ParseStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn parse(&self, text: &str) -> Result<Candidates, ParseError>;
}

/// Last resort: one root node labelled with the first line of the text.
pub struct StubFallback;

/// Id given to the synthesized stub root
pub const STUB_ID: &str = "root";

impl ParseStrategy for StubFallback {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Stub
    }

    fn parse(&self, text: &str) -> Result<Candidates, ParseError> {
        let label: String = text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(|l| l.chars().take(80).collect())
            .unwrap_or_else(|| "Untitled".to_string());

        Ok(Candidates {
            nodes: vec![Node::new(STUB_ID, label).with_node_type("stub")],
            rejected: Vec::new(),
        })
    }
}

/// Result of a successful chain run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseOutcome {
    pub map: MindMap,
    /// The strategy that produced `map`
    pub strategy: StrategyKind,
    pub report: ValidationReport,
    /// Strategies that were tried and failed before the winner
    pub attempts: Vec<Attempt>,
}

impl ParseOutcome {
    /// True when nothing parsed and the map is a synthesized stub.
    pub fn is_stub(&self) -> bool {
        self.strategy == StrategyKind::Stub
    }
}

/// Ordered chain of parse strategies.
pub struct ParserChain {
    strategies: Vec<Box<dyn ParseStrategy>>,
    policy: DanglingParentPolicy,
}

impl Default for ParserChain {
    fn default() -> Self {
        Self::new(DanglingParentPolicy::default())
    }
}

impl ParserChain {
    /// The full chain, ending in the stub fallback. Never fails.
    pub fn new(policy: DanglingParentPolicy) -> Self {
        let mut chain = Self::strict(policy);
        chain.strategies.push(Box::new(StubFallback));
        chain
    }

    /// The chain without the stub: fails with [`ParseError::Exhausted`]
    /// when no strategy yields a valid map.
    pub fn strict(policy: DanglingParentPolicy) -> Self {
        Self {
            strategies: vec![
                Box::new(DirectDecode),
                Box::new(FenceStrip),
                Box::new(ObjectExtraction),
                Box::new(LiteralNormalization),
                Box::new(OutlineParse),
            ],
            policy,
        }
    }

    pub fn is_strict(&self) -> bool {
        !self.kinds().contains(&StrategyKind::Stub)
    }

    pub fn policy(&self) -> DanglingParentPolicy {
        self.policy
    }

    pub fn kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Run the strategies in order; first valid map wins.
    pub fn parse(&self, text: &str) -> Result<ParseOutcome, ParseError> {
        let mut attempts = Vec::new();

        for strategy in &self.strategies {
            let kind = strategy.kind();
            match strategy.parse(text).and_then(|c| self.finish(c)) {
                Ok((map, report)) => {
                    if kind == StrategyKind::Stub {
                        warn!(failed = attempts.len(), "no parse strategy matched, using stub map");
                    } else {
                        debug!(strategy = %kind, nodes = map.len(), dropped = report.dropped.len(), "parsed backend output");
                    }
                    return Ok(ParseOutcome {
                        map,
                        strategy: kind,
                        report,
                        attempts,
                    });
                }
                Err(e) => {
                    debug!(strategy = %kind, error = %e, "parse strategy failed");
                    attempts.push(Attempt {
                        strategy: kind,
                        error: e.to_string(),
                    });
                }
            }
        }

        Err(ParseError::Exhausted(attempts))
    }

    fn finish(&self, candidates: Candidates) -> Result<(MindMap, ValidationReport), ParseError> {
        let offered = candidates.nodes.len() + candidates.rejected.len();
        let (map, mut report) =
            validate(candidates.nodes, self.policy).map_err(ParseError::Rejected)?;

        if map.is_empty() && offered > 0 {
            return Err(ParseError::AllRejected(offered));
        }

        let mut dropped = candidates.rejected;
        dropped.append(&mut report.dropped);
        report.dropped = dropped;
        Ok((map, report))
    }
}
