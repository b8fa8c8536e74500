//! Storage Module
//!
//! The persistent key-value capability the cache manager writes entries to,
//! with an in-memory and a file-backed implementation.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;

// == Key-Value Store ==
/// Synchronous string key-value store shared with unrelated data.
///
/// Mirrors browser `localStorage`: raw keys, string values, writes may fail
/// with [`StoreError::QuotaExceeded`].
pub trait KeyValueStore: Send {
    /// Returns the raw value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Deletes `key`; deleting a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    /// Returns every key currently stored.
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Bytes a key-value pair counts against a quota.
pub(crate) fn pair_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}
