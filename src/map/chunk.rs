//! Transcript chunks

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One timestamped fragment of transcript text.
///
/// Chunks are ordered by arrival, not by `start`; nothing in the pipeline
/// re-sorts them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Chunk {
    /// Offset of the fragment start, in seconds
    pub start: f64,
    /// Offset of the fragment end, in seconds
    pub end: f64,
    pub text: String,
}

impl Chunk {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Inbound request body carrying a batch of chunks.
///
/// Accepts either `{"chunks": [...]}` or a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TranscriptPayload {
    Wrapped { chunks: Vec<Chunk> },
    Bare(Vec<Chunk>),
}

impl TranscriptPayload {
    pub fn into_chunks(self) -> Vec<Chunk> {
        match self {
            Self::Wrapped { chunks } => chunks,
            Self::Bare(chunks) => chunks,
        }
    }
}
