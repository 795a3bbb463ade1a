//! In-memory key-value store

use soul_core::KeyValueStore;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// Volatile store for tests and sessions that must not touch disk
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> soul_core::Result<Option<String>> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> soul_core::Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> soul_core::Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.set("ui.theme", "dark").unwrap();
        assert_eq!(store.get("ui.theme").unwrap().as_deref(), Some("dark"));

        store.set("ui.theme", "light").unwrap();
        assert_eq!(store.get("ui.theme").unwrap().as_deref(), Some("light"));
        assert_eq!(store.len(), 1);

        store.remove("ui.theme").unwrap();
        assert_eq!(store.get("ui.theme").unwrap(), None);

        // Removing a missing key is fine
        store.remove("ui.theme").unwrap();
    }
}
