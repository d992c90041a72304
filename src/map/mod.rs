//! Core data model: transcript chunks, outline nodes, and the maps they form

mod chunk;
mod node;
mod validate;


pub use chunk::{Chunk, TranscriptPayload};
pub use node::{MindMap, Node, Position};
pub use validate::{validate, violations, DanglingParentPolicy, ValidationError, ValidationReport};
