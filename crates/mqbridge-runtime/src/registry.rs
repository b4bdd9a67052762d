//! Compiled template registry
//!
//! Readers share an `RwLock` read guard and clone out an `Arc`, so lookups
//! never block each other and a render never holds the lock.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use mqbridge_template::CompiledTemplate;

/// Concurrent map from rule id to compiled template
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: RwLock<HashMap<String, Arc<CompiledTemplate>>>,
}

impl TemplateRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a template
    pub fn load(&self, rule_id: &str) -> Option<Arc<CompiledTemplate>> {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(rule_id)
            .cloned()
    }

    /// Insert or replace a template, returning the new count
    pub fn store(&self, rule_id: impl Into<String>, template: CompiledTemplate) -> usize {
        let mut templates = self.templates.write().unwrap_or_else(PoisonError::into_inner);
        templates.insert(rule_id.into(), Arc::new(template));
        templates.len()
    }

    /// Remove a template, returning the new count
    pub fn delete(&self, rule_id: &str) -> usize {
        let mut templates = self.templates.write().unwrap_or_else(PoisonError::into_inner);
        templates.remove(rule_id);
        templates.len()
    }

    /// Number of registered templates
    pub fn count(&self) -> usize {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Registered rule ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(name: &str) -> CompiledTemplate {
        mqbridge_template::compile(name, "{}").unwrap()
    }

    #[test]
    fn test_store_load_delete() {
        let registry = TemplateRegistry::new();
        assert_eq!(registry.store("a", template("a")), 1);
        assert_eq!(registry.store("b", template("b")), 2);
        assert_eq!(registry.store("a", template("a")), 2);
        assert_eq!(registry.load("a").unwrap().name(), "a");
        assert!(registry.load("c").is_none());
        assert_eq!(registry.ids(), vec!["a", "b"]);

        assert_eq!(registry.delete("a"), 1);
        assert_eq!(registry.delete("missing"), 1);
        assert!(registry.load("a").is_none());
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_loaded_template_outlives_delete() {
        let registry = TemplateRegistry::new();
        registry.store("a", template("a"));
        let held = registry.load("a").unwrap();
        registry.delete("a");
        assert_eq!(held.name(), "a");
    }

    #[test]
    fn test_concurrent_readers() {
        let registry = Arc::new(TemplateRegistry::new());
        registry.store("a", template("a"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        assert!(registry.load("a").is_some());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
