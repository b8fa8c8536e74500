//! File-backed store
//!
//! Persists the whole key space as a single JSON object so cached entries
//! survive process restarts.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{pair_size, KeyValueStore};
use crate::error::StoreError;

// == File Store ==
/// Durable store backed by one JSON file.
///
/// The file is loaded once on open and rewritten after every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
    used: usize,
}

impl FileStore {
    /// Opens the store at `path`, creating parent directories as needed.
    ///
    /// A missing file yields an empty store; an unreadable file is an error.
    pub fn open(path: impl Into<PathBuf>, quota: Option<usize>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let entries: BTreeMap<String, String> = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| StoreError::Corrupt(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        let used = entries.iter().map(|(k, v)| pair_size(k, v)).sum();
        debug!("Opened file store {} with {} keys", path.display(), entries.len());

        Ok(Self {
            path,
            entries,
            quota,
            used,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the current key space to disk via a temporary file and rename.
    fn flush(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string(&self.entries)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
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

        let previous = self.entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush() {
            // keep memory consistent with what is on disk
            match previous {
                Some(old) => self.entries.insert(key.to_string(), old),
                None => self.entries.remove(key),
            };
            return Err(e);
        }

        self.used = needed;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let Some(old) = self.entries.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.flush() {
            self.entries.insert(key.to_string(), old);
            return Err(e);
        }

        self.used -= pair_size(key, &old);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.keys().cloned().collect())
    }
}
