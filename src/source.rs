//! Layered variable lookup for URL templates
//!
//! The resolver never hard-codes where a placeholder value comes from.
//! Callers inject an ordered chain of [`DataSource`] capabilities
//! (call-supplied variables first, then element-scoped data, then ambient
//! context-scoped data); the first layer that defines a key wins.

use std::collections::HashMap;

/// Read-only lookup capability for template placeholder values
pub trait DataSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Map-backed data source (call-supplied variables, test fixtures)
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    values: HashMap<String, String>,
}

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key/value pair
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl From<HashMap<String, String>> for MapSource {
    fn from(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

impl DataSource for MapSource {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// First defined value across the ordered layer chain
pub fn lookup(layers: &[&dyn DataSource], key: &str) -> Option<String> {
    layers.iter().find_map(|layer| layer.get(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_layer_wins() {
        let call = MapSource::new().with("id", "call");
        let element = MapSource::new().with("id", "element").with("page", "2");

        let layers: [&dyn DataSource; 2] = [&call, &element];
        assert_eq!(lookup(&layers, "id"), Some("call".to_string()));
        assert_eq!(lookup(&layers, "page"), Some("2".to_string()));
        assert_eq!(lookup(&layers, "missing"), None);
    }
}
