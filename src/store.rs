//! Persistent storage capability behind the response cache
//!
//! The engine never owns storage policy; it consumes whatever
//! [`PersistentStore`] the embedder injects (session storage, disk, an
//! in-memory map). [`MemoryStore`] is the bundled lock-free default.

use dashmap::DashMap;
use std::sync::Arc;

/// Minimal key/value storage capability
pub trait PersistentStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

/// In-memory store over a concurrent map (clone-handle, shared contents)
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }
}
