//! mindstream: live transcript to evolving mind map
//!
//! Turns a stream of timestamped transcript chunks into a hierarchical
//! outline, persisted per conversation session.
//!
//! # Core Concepts
//!
//! - **Chunks**: timestamped transcript fragments, kept in a bounded per-session window
//! - **Maps**: forests of `{id, text, parent}` nodes, validated at every boundary
//! - **Pipeline**: recall, extract, merge and persist, run in a fixed or planned order
//!
//! The generative backend is untrusted: its output goes through an ordered
//! chain of parse strategies, and merge results are reconciled so a map never
//! loses nodes or gains duplicate topics.
//!
//! # Example
//!
//! ```
//! use mindstream::{ParserChain, StrategyKind};
//!
//! let outcome = ParserChain::default()
//!     .parse("```json\n{\"nodes\":[{\"id\":\"1\",\"text\":\"A\",\"parent\":null}]}\n```")
//!     .unwrap();
//! assert_eq!(outcome.strategy, StrategyKind::FenceStrip);
//! assert_eq!(outcome.map.len(), 1);
//! ```

pub mod api;
pub mod backend;
pub mod buffer;
pub mod config;
pub mod error;
pub mod extract;
pub mod map;
pub mod mcp;
pub mod memory;
pub mod merge;
pub mod orchestrator;
pub mod parse;
pub mod prompts;
pub mod session;

pub use api::MindstreamApi;
pub use backend::{BackendError, CallPolicy, CommandBackend, GenerativeBackend, MockBackend};
pub use buffer::ChunkBuffer;
pub use config::{Config, ConfigError};
pub use error::MindstreamError;
pub use extract::{Extraction, StructureExtractor};
pub use map::{
    validate, Chunk, DanglingParentPolicy, MindMap, Node, TranscriptPayload, ValidationError,
    ValidationReport,
};
pub use memory::{InMemoryStore, OpenStore, SessionStore, SqliteStore, StoreError};
pub use merge::{BackendMerger, HeuristicMerger, MergeOutcome, TreeMerger};
pub use orchestrator::{
    CancellationToken, PipelineFailure, PipelineMode, PipelineRun, Plan, PlannedStep, Planner,
    RunContext, StaticPlanner, Step, ToolOrchestrator, TraceEntry,
};
pub use parse::{ParseError, ParseOutcome, ParserChain, StrategyKind};
pub use session::SessionRegistry;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
