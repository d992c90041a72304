//! SQLite session store

use super::traits::{OpenStore, SessionStore, StoreError, StoreResult};
use crate::map::MindMap;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed session store
///
/// One row per session holding the serialized map. Thread-safe via an
/// internal mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                map_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// When the session's map was last written (RFC 3339)
    pub fn updated_at(&self, session_id: &str) -> StoreResult<Option<String>> {
        let conn = self.conn()?;
        let ts = conn
            .query_row(
                "SELECT updated_at FROM sessions WHERE session_id = ?1",
                params![session_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(ts)
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl SessionStore for SqliteStore {
    fn get(&self, session_id: &str) -> StoreResult<Option<MindMap>> {
        let conn = self.conn()?;
        let json = conn
            .query_row(
                "SELECT map_json FROM sessions WHERE session_id = ?1",
                params![session_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn set(&self, session_id: &str, map: &MindMap) -> StoreResult<()> {
        let json = serde_json::to_string(map)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions (session_id, map_json, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(session_id) DO UPDATE SET map_json = excluded.map_json, updated_at = excluded.updated_at",
            params![session_id, json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&self, session_id: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM sessions WHERE session_id = ?1", params![session_id])?;
        Ok(rows > 0)
    }

    fn list_sessions(&self) -> StoreResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT session_id FROM sessions ORDER BY session_id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn len(&self) -> StoreResult<usize> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}
