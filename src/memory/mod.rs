//! Session memory: the last persisted map for each session
//!
//! Backends implement the `SessionStore` trait. `SqliteStore` is the durable
//! default (`--db :memory:` gives it an in-memory SQLite connection);
//! `InMemoryStore` is the lock-and-map store used by tests and embedders.

mod in_memory;
mod sqlite;
mod traits;

pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{OpenStore, SessionStore, StoreError, StoreResult};
