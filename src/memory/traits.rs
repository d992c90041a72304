//! Session store trait definitions

use crate::map::MindMap;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during session store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Result type for session store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable `session_id → map` storage.
///
/// Implementations must be thread-safe (Send + Sync): the API shares one
/// store across every session. Entries never expire; a session's map lives
/// until it is overwritten or removed.
pub trait SessionStore: Send + Sync {
    /// Load the last persisted map for a session
    fn get(&self, session_id: &str) -> StoreResult<Option<MindMap>>;

    /// Create or replace a session's map
    fn set(&self, session_id: &str, map: &MindMap) -> StoreResult<()>;

    /// Delete a session's map; true if one existed
    fn remove(&self, session_id: &str) -> StoreResult<bool>;

    /// All session ids with a stored map, sorted
    fn list_sessions(&self) -> StoreResult<Vec<String>>;

    /// The session's map, or an empty map if the session was never persisted
    fn recall(&self, session_id: &str) -> StoreResult<MindMap> {
        Ok(self.get(session_id)?.unwrap_or_default())
    }

    /// Number of stored sessions
    fn len(&self) -> StoreResult<usize> {
        Ok(self.list_sessions()?.len())
    }

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Extension trait for opening stores from paths
pub trait OpenStore: SessionStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StoreResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StoreResult<Self>;
}
