//! Crate-level error taxonomy

use crate::backend::BackendError;
use crate::memory::StoreError;
use crate::parse::ParseError;
use thiserror::Error;

/// Errors surfaced by pipeline operations.
///
/// `BackendUnavailable` means no usable response came back from the backend
/// (after the retry); `MalformedOutput` means a response came back but a
/// strict parser chain could not read it.
#[derive(Debug, Error)]
pub enum MindstreamError {
    #[error("generative backend unavailable: {0}")]
    BackendUnavailable(#[from] BackendError),

    #[error("malformed backend output: {0}")]
    MalformedOutput(#[from] ParseError),

    #[error("memory store error: {0}")]
    MemoryStore(#[from] StoreError),

    #[error("run cancelled")]
    Cancelled,

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl MindstreamError {
    /// Stable machine-readable tag, used in serialized failures.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::MalformedOutput(_) => "malformed_output",
            Self::MemoryStore(_) => "memory_store",
            Self::Cancelled => "cancelled",
            Self::InvalidInput(_) => "invalid_input",
        }
    }
}

pub type Result<T> = std::result::Result<T, MindstreamError>;
