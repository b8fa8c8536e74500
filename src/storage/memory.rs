//! In-memory store with an optional byte quota.

use std::collections::HashMap;

use super::{pair_size, KeyValueStore};
use crate::error::StoreError;

// == Memory Store ==
/// HashMap-backed store. Entries are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    /// Maximum total bytes of keys and values, None = unbounded
    quota: Option<usize>,
    /// Current total bytes of keys and values
    used: usize,
}

impl MemoryStore {
    /// Creates an unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store rejecting writes that would exceed `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// Returns the bytes currently used.
    pub fn used_bytes(&self) -> usize {
        self.used
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let replaced = self.entries.get(key).map_or(0, |old| pair_size(key, old));
        let needed = self.used - replaced + pair_size(key, value);

        if let Some(quota) = self.quota {
            if needed > quota {
                return Err(StoreError::QuotaExceeded);
            }
        }

        self.entries.insert(key.to_string(), value.to_string());
        self.used = needed;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if let Some(old) = self.entries.remove(key) {
            self.used -= pair_size(key, &old);
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let mut store = MemoryStore::new();

        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));

        store.remove("a").unwrap();
        assert!(store.get("a").unwrap().is_none());
        assert_eq!(store.used_bytes(), 0);
    }

    #[test]
    fn test_remove_missing_key_is_ok() {
        let mut store = MemoryStore::new();
        assert!(store.remove("missing").is_ok());
    }

    #[test]
    fn test_quota_exceeded() {
        let mut store = MemoryStore::with_quota(10);

        store.set("k", "12345").unwrap();
        let result = store.set("other", "123456");

        assert!(matches!(result, Err(StoreError::QuotaExceeded)));
        assert!(store.get("other").unwrap().is_none());
        assert_eq!(store.used_bytes(), 6);
    }

    #[test]
    fn test_overwrite_accounts_for_replaced_value() {
        let mut store = MemoryStore::with_quota(10);

        store.set("k", "123456789").unwrap();
        // replacing frees the old value first
        store.set("k", "987654321").unwrap();

        assert_eq!(store.used_bytes(), 10);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_keys_snapshot() {
        let mut store = MemoryStore::new();
        store.set("x", "1").unwrap();
        store.set("y", "2").unwrap();

        let mut keys = store.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["x", "y"]);
    }
}
