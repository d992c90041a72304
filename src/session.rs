//! Per-session state and serialization
//!
//! Each session id maps to one async mutex guarding that session's chunk
//! buffer. A pipeline run holds the guard from chunk ingestion through
//! Persist, so two runs for the same session never interleave their
//! recall-merge-persist cycles. Different sessions never share a lock.

use crate::buffer::{ChunkBuffer, DEFAULT_MAX_CHUNKS};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Mutable state owned by one session.
#[derive(Debug)]
pub struct Session {
    id: String,
    buffer: ChunkBuffer,
}

impl Session {
    fn new(id: &str, max_chunks: usize) -> Self {
        Self {
            id: id.to_string(),
            buffer: ChunkBuffer::new(max_chunks),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn buffer(&self) -> &ChunkBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut ChunkBuffer {
        &mut self.buffer
    }
}

/// Creates sessions on first reference and hands out their locks.
///
/// Sessions live for the lifetime of the registry.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Mutex<Session>>>,
    max_chunks: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNKS)
    }
}

impl SessionRegistry {
    pub fn new(max_chunks: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            max_chunks,
        }
    }

    /// Wait for exclusive access to a session, creating it if needed.
    pub async fn lock(&self, session_id: &str) -> OwnedMutexGuard<Session> {
        let slot = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!(session = session_id, "created session");
                Arc::new(Mutex::new(Session::new(session_id, self.max_chunks)))
            })
            .clone();
        slot.lock_owned().await
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Ids of every session referenced so far, sorted.
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn max_chunks(&self) -> usize {
        self.max_chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Chunk;
    use std::time::Duration;

    #[tokio::test]
    async fn sessions_are_created_on_first_lock() {
        let registry = SessionRegistry::new(2);
        assert!(registry.is_empty());

        {
            let mut session = registry.lock("a").await;
            assert_eq!(session.id(), "a");
            session
                .buffer_mut()
                .add(vec![Chunk::new(0.0, 1.0, "x"), Chunk::new(1.0, 2.0, "y"), Chunk::new(2.0, 3.0, "z")]);
        }

        assert!(registry.contains("a"));
        let session = registry.lock("a").await;
        assert_eq!(session.buffer().len(), 2);
        assert_eq!(session.buffer().capacity(), 2);
    }

    #[tokio::test]
    async fn buffers_are_isolated_per_session() {
        let registry = SessionRegistry::default();
        registry
            .lock("a")
            .await
            .buffer_mut()
            .add(vec![Chunk::new(0.0, 1.0, "only in a")]);

        assert!(registry.lock("b").await.buffer().is_empty());
        assert_eq!(registry.session_ids(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn same_session_holders_are_serialized() {
        let registry = Arc::new(SessionRegistry::default());
        let guard = registry.lock("s").await;

        let contender = {
            let registry = registry.clone();
            tokio::spawn(async move {
                let _guard = registry.lock("s").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        // Another session is not blocked.
        let other = tokio::time::timeout(Duration::from_millis(100), registry.lock("t")).await;
        assert!(other.is_ok());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }
}
