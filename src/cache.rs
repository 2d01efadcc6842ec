//! Response cache keyed by fully resolved URL
//!
//! Entries are written only from the terminal-success transition, and
//! never for empty or falsy responses. The backing [`PersistentStore`] is
//! injected; the cache holds no storage policy beyond the key shape.

use crate::store::PersistentStore;
use serde_json::Value;
use std::sync::Arc;

/// Resolved-URL → decoded-response store over an injected capability
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn PersistentStore>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self { store }
    }

    /// Previously decoded response for this resolved URL, if cached
    pub fn get(&self, url: &str) -> Option<Value> {
        let raw = self.store.get(url)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::debug!(url = %url, error = %err, "discarding undecodable cache entry");
                None
            }
        }
    }

    /// Write-through after a successful settlement. Empty/falsy responses
    /// are never cached.
    pub fn put(&self, url: &str, response: &Value) {
        if !is_cacheable(response) {
            tracing::debug!(url = %url, "skipping cache write for empty response");
            return;
        }
        match serde_json::to_string(response) {
            Ok(raw) => self.store.set(url, &raw),
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "failed to serialize response for cache");
            }
        }
    }
}

fn is_cacheable(response: &Value) -> bool {
    match response {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn cache() -> (ResponseCache, MemoryStore) {
        let store = MemoryStore::new();
        (ResponseCache::new(Arc::new(store.clone())), store)
    }

    #[test]
    fn round_trips_decoded_responses() {
        let (cache, _) = cache();
        let response = json!({"name": "ada", "id": 7});

        cache.put("/users/7", &response);
        assert_eq!(cache.get("/users/7"), Some(response));
        assert_eq!(cache.get("/users/8"), None);
    }

    #[test]
    fn empty_responses_are_never_cached() {
        let (cache, store) = cache();

        cache.put("/a", &Value::Null);
        cache.put("/b", &json!(false));
        cache.put("/c", &json!(""));
        cache.put("/d", &json!({}));
        cache.put("/e", &json!([]));

        assert!(store.is_empty());
        // Non-empty falsy-adjacent values still cache
        cache.put("/f", &json!(0));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn last_write_wins_per_url() {
        let (cache, _) = cache();
        cache.put("/u", &json!({"v": 1}));
        cache.put("/u", &json!({"v": 2}));
        assert_eq!(cache.get("/u"), Some(json!({"v": 2})));
    }

    #[test]
    fn undecodable_entries_read_as_miss() {
        let (cache, store) = cache();
        store.set("/u", "not json at all {");
        assert_eq!(cache.get("/u"), None);
    }
}
