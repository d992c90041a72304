//! Rolling window of transcript chunks for one session
//!
//! The buffer keeps the most recent `max_chunks` chunks in arrival order and
//! caches the last merged map so callers can re-read it without touching the
//! session store.

use crate::map::{Chunk, MindMap};

/// Default window size
pub const DEFAULT_MAX_CHUNKS: usize = 100;

/// Bounded FIFO of chunks plus the last known map.
#[derive(Debug, Clone)]
pub struct ChunkBuffer {
    chunks: Vec<Chunk>,
    max_chunks: usize,
    map: MindMap,
}

impl Default for ChunkBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNKS)
    }
}

impl ChunkBuffer {
    pub fn new(max_chunks: usize) -> Self {
        Self {
            chunks: Vec::new(),
            max_chunks,
            map: MindMap::new(),
        }
    }

    /// Append chunks, then evict the oldest until at most `max_chunks` remain.
    pub fn add(&mut self, chunks: impl IntoIterator<Item = Chunk>) {
        self.chunks.extend(chunks);
        if self.chunks.len() > self.max_chunks {
            let excess = self.chunks.len() - self.max_chunks;
            self.chunks.drain(..excess);
        }
    }

    /// The current window, oldest first.
    pub fn get_recent(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn update_map(&mut self, map: MindMap) {
        self.map = map;
    }

    pub fn get_map(&self) -> &MindMap {
        &self.map
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_chunks
    }

    /// Drop all chunks. The cached map is kept.
    pub fn clear(&mut self) {
        self.chunks.clear();
    }
}
