//! Process-local session store

use super::traits::{SessionStore, StoreResult};
use crate::map::MindMap;
use dashmap::DashMap;

/// Session maps held in a concurrent hash map. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    maps: DashMap<String, MindMap>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemoryStore {
    fn get(&self, session_id: &str) -> StoreResult<Option<MindMap>> {
        Ok(self.maps.get(session_id).map(|m| m.value().clone()))
    }

    fn set(&self, session_id: &str, map: &MindMap) -> StoreResult<()> {
        self.maps.insert(session_id.to_string(), map.clone());
        Ok(())
    }

    fn remove(&self, session_id: &str) -> StoreResult<bool> {
        Ok(self.maps.remove(session_id).is_some())
    }

    fn list_sessions(&self) -> StoreResult<Vec<String>> {
        let mut ids: Vec<String> = self.maps.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.maps.len())
    }
}
