//! Cache Manager Module
//!
//! Typed access to the persistent store: version and TTL gated reads,
//! best-effort writes, cascade invalidation and expiry sweeps.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::entry::{current_timestamp_ms, CacheEntry};
use crate::cache::events::{CacheEvent, EventSink, PurgeReason};
use crate::cache::policy::{cascade_prefixes, lookup_ttl};
use crate::cache::stats::CacheStats;
use crate::config::Config;
use crate::error::StoreError;
use crate::fetch::Fetcher;
use crate::storage::KeyValueStore;
use crate::tasks::spawn_sweep_task;

// == Cache Manager ==
/// Read-through cache over a key-value store and a network fetcher.
///
/// Every failure local to the cache is swallowed: reads degrade to misses,
/// writes report `false`, and a [`CacheEvent`] describes what happened.
pub struct CacheManager {
    pub(crate) config: Config,
    inner: Mutex<Inner>,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    events: Option<EventSink>,
    /// Per-key gates serializing concurrent read-through fetches
    pub(crate) in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

/// State guarded by the manager lock.
struct Inner {
    store: Box<dyn KeyValueStore>,
    stats: CacheStats,
    /// Events raised under the lock, emitted once it is released
    pending: Vec<CacheEvent>,
}

impl CacheManager {
    // == Constructor ==
    /// Creates a manager owning `store` and `fetcher`.
    ///
    /// The sweep task is not started; call [`CacheManager::start_sweeper`].
    pub fn new(
        config: Config,
        store: impl KeyValueStore + 'static,
        fetcher: impl Fetcher + 'static,
    ) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                store: Box::new(store),
                stats: CacheStats::new(),
                pending: Vec::new(),
            }),
            fetcher: Arc::new(fetcher),
            events: None,
            in_flight: Mutex::new(HashMap::new()),
            sweeper: Mutex::new(None),
        }
    }

    /// Registers a callback receiving every [`CacheEvent`].
    pub fn with_event_sink(mut self, sink: EventSink) -> Self {
        self.events = Some(sink);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // == Get ==
    /// Returns the cached payload for `key`, or None.
    ///
    /// Corrupt, stale-version and expired entries are deleted as a side
    /// effect and read as absent.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_entry(key).map(|entry| entry.data)
    }

    /// Like [`CacheManager::get`] but returns the whole entry.
    pub fn get_entry(&self, key: &str) -> Option<CacheEntry> {
        self.with_inner(|inner| inner.read(&self.config, key))
    }

    // == Set ==
    /// Stores `data` under `key`, replacing any previous entry.
    ///
    /// TTL resolution: explicit `ttl`, else the policy table, else the
    /// default TTL. An explicit zero TTL stores an entry that never expires.
    /// Returns whether the entry was written.
    pub fn set(&self, key: &str, data: Value, ttl: Option<Duration>) -> bool {
        let ttl = self.resolve_ttl(key, ttl);
        self.with_inner(|inner| inner.write(&self.config, key, data, ttl))
    }

    /// Returns the lifetime a write of `key` gets, None = never expires.
    pub fn resolve_ttl(&self, key: &str, ttl: Option<Duration>) -> Option<Duration> {
        match ttl {
            Some(ttl) if ttl.is_zero() => None,
            Some(ttl) => Some(ttl),
            None => Some(lookup_ttl(&self.config.ttl_policies, key).unwrap_or(self.config.default_ttl)),
        }
    }

    // == Remove ==
    /// Deletes `key`. Never fails observably.
    pub fn remove(&self, key: &str) {
        self.with_inner(|inner| {
            inner.remove_raw(&namespaced(&self.config, key), key);
        });
    }

    // == Invalidate ==
    /// Removes `key` and clears every category that depends on it.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate(&self, key: &str) -> usize {
        let prefixes = cascade_prefixes(&self.config.invalidation_rules, key).to_vec();

        self.with_inner(|inner| {
            let mut removed = usize::from(inner.remove_raw(&namespaced(&self.config, key), key));
            for prefix in &prefixes {
                removed += inner.remove_where(&self.config, |k| k.starts_with(prefix.as_str()));
            }
            inner.pending.push(CacheEvent::Invalidated {
                key: key.to_string(),
                prefixes,
            });
            removed
        })
    }

    // == Clear By Prefix ==
    /// Removes every entry whose logical key starts with `prefix`.
    pub fn clear_by_prefix(&self, prefix: &str) -> usize {
        self.with_inner(|inner| inner.remove_where(&self.config, |k| k.starts_with(prefix)))
    }

    // == Clear All ==
    /// Removes every entry under the namespace.
    pub fn clear_all(&self) -> usize {
        self.with_inner(|inner| inner.remove_where(&self.config, |_| true))
    }

    // == Sweep Expired ==
    /// Removes unparsable and expired entries, returning how many went.
    ///
    /// Entries without an expiry and entries written under another version
    /// are left alone.
    pub fn sweep_expired(&self) -> usize {
        self.with_inner(|inner| inner.sweep(&self.config))
    }

    // == Stats ==
    /// Returns current statistics with a fresh entry count.
    pub fn stats(&self) -> CacheStats {
        self.with_inner(|inner| {
            let total = inner
                .store
                .keys()
                .map(|keys| {
                    keys.iter()
                        .filter(|k| k.starts_with(self.config.namespace.as_str()))
                        .count()
                })
                .unwrap_or(0);
            inner.stats.set_total_entries(total);
            inner.stats.clone()
        })
    }

    // == Sweeper Lifecycle ==
    /// Starts the background sweep: once now, then every `sweep_interval`.
    ///
    /// A zero interval sweeps once without scheduling. Calling this while a
    /// sweeper is already running does nothing. Requires a tokio runtime.
    pub fn start_sweeper(self: &Arc<Self>) {
        let mut slot = lock(&self.sweeper);
        if slot.is_some() {
            return;
        }

        if self.config.sweep_interval.is_zero() {
            drop(slot);
            self.sweep_expired();
            return;
        }

        *slot = Some(spawn_sweep_task(Arc::downgrade(self), self.config.sweep_interval));
    }

    /// Returns true while the background sweep task is scheduled.
    pub fn is_sweeping(&self) -> bool {
        lock(&self.sweeper)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the background sweep task.
    pub fn shutdown(&self) {
        if let Some(handle) = lock(&self.sweeper).take() {
            handle.abort();
            info!("Cache sweep task stopped");
        }
    }

    // == Internals ==
    /// Runs `f` under the store lock, then emits the events it raised.
    fn with_inner<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let (result, events) = {
            let mut inner = lock(&self.inner);
            let result = f(&mut inner);
            (result, std::mem::take(&mut inner.pending))
        };

        for event in events {
            self.emit(event);
        }
        result
    }

    /// Logs an event and forwards it to the sink.
    pub(crate) fn emit(&self, event: CacheEvent) {
        match &event {
            CacheEvent::Hit { key } => debug!("Cache hit: {}", key),
            CacheEvent::Miss { key } => debug!("Cache miss: {}", key),
            CacheEvent::Purged { key, reason } => debug!("Purged {} entry: {}", reason, key),
            CacheEvent::Stored { key } => debug!("Cached: {}", key),
            CacheEvent::ReadFailed { key, error } => warn!("Cache get error for {}: {}", key, error),
            CacheEvent::QuotaExceeded { key } => {
                warn!("Storage quota exceeded writing {}, clearing old caches", key)
            }
            CacheEvent::WriteAbandoned { key, error } => warn!("Failed to cache {}: {}", key, error),
            CacheEvent::NotCacheable { key, reason } => {
                warn!("Failed to cache response for {}: {}", key, reason)
            }
            CacheEvent::RemoveFailed { key, error } => warn!("Cache remove error for {}: {}", key, error),
            CacheEvent::Invalidated { key, prefixes } => {
                debug!("Invalidated {} (cascade: {:?})", key, prefixes)
            }
            CacheEvent::Swept { removed } if *removed > 0 => {
                info!("Cleared {} expired cache entries", removed)
            }
            CacheEvent::Swept { .. } => debug!("Sweep: no expired entries found"),
        }

        if let Some(sink) = &self.events {
            sink(&event);
        }
    }
}

impl Drop for CacheManager {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.sweeper).take() {
            handle.abort();
        }
    }
}

impl Inner {
    fn read(&mut self, config: &Config, key: &str) -> Option<CacheEntry> {
        let raw_key = namespaced(config, key);

        let raw = match self.store.get(&raw_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return self.miss(key),
            Err(e) => {
                self.pending.push(CacheEvent::ReadFailed {
                    key: key.to_string(),
                    error: e.to_string(),
                });
                return self.miss(key);
            }
        };

        let entry = match CacheEntry::from_json(&raw) {
            Ok(entry) => entry,
            Err(_) => return self.purge(&raw_key, key, PurgeReason::Corrupt),
        };

        if entry.version != config.version {
            return self.purge(&raw_key, key, PurgeReason::VersionMismatch);
        }

        if entry.is_expired() {
            return self.purge(&raw_key, key, PurgeReason::Expired);
        }

        self.stats.record_hit();
        self.pending.push(CacheEvent::Hit { key: key.to_string() });
        Some(entry)
    }

    fn miss(&mut self, key: &str) -> Option<CacheEntry> {
        self.stats.record_miss();
        self.pending.push(CacheEvent::Miss { key: key.to_string() });
        None
    }

    fn purge(&mut self, raw_key: &str, key: &str, reason: PurgeReason) -> Option<CacheEntry> {
        self.remove_raw(raw_key, key);
        self.stats.record_purge();
        self.pending.push(CacheEvent::Purged {
            key: key.to_string(),
            reason,
        });
        self.miss(key)
    }

    fn write(&mut self, config: &Config, key: &str, data: Value, ttl: Option<Duration>) -> bool {
        let raw_key = namespaced(config, key);
        let entry = CacheEntry::new(config.version.as_str(), data, ttl);

        let raw = match entry.to_json() {
            Ok(raw) => raw,
            Err(e) => return self.abandon(key, e.to_string()),
        };

        let result = match self.store.set(&raw_key, &raw) {
            Err(StoreError::QuotaExceeded) => {
                self.pending.push(CacheEvent::QuotaExceeded { key: key.to_string() });
                self.sweep(config);
                self.store.set(&raw_key, &raw)
            }
            other => other,
        };

        match result {
            Ok(()) => {
                self.stats.record_write();
                self.pending.push(CacheEvent::Stored { key: key.to_string() });
                true
            }
            Err(e) => self.abandon(key, e.to_string()),
        }
    }

    fn abandon(&mut self, key: &str, error: String) -> bool {
        self.stats.record_write_failure();
        self.pending.push(CacheEvent::WriteAbandoned {
            key: key.to_string(),
            error,
        });
        false
    }

    /// Deletes one raw key, returning whether it was present.
    fn remove_raw(&mut self, raw_key: &str, key: &str) -> bool {
        let existed = matches!(self.store.get(raw_key), Ok(Some(_)));
        match self.store.remove(raw_key) {
            Ok(()) => existed,
            Err(e) => {
                self.pending.push(CacheEvent::RemoveFailed {
                    key: key.to_string(),
                    error: e.to_string(),
                });
                false
            }
        }
    }

    /// Removes every namespaced key whose logical name satisfies `matches`.
    fn remove_where(&mut self, config: &Config, matches: impl Fn(&str) -> bool) -> usize {
        let mut removed = 0;
        for raw_key in self.namespaced_keys(config) {
            let key = &raw_key[config.namespace.len()..];
            if matches(key) && self.remove_raw(&raw_key, key) {
                removed += 1;
            }
        }
        removed
    }

    fn sweep(&mut self, config: &Config) -> usize {
        let now = current_timestamp_ms();
        let mut removed = 0;

        for raw_key in self.namespaced_keys(config) {
            let stale = match self.store.get(&raw_key) {
                Ok(Some(raw)) => is_sweepable(&raw, now),
                _ => false,
            };
            if stale && self.store.remove(&raw_key).is_ok() {
                removed += 1;
            }
        }

        self.stats.record_sweep(removed);
        self.pending.push(CacheEvent::Swept { removed });
        removed
    }

    /// Snapshot of the keys under the namespace, taken before any mutation.
    fn namespaced_keys(&mut self, config: &Config) -> Vec<String> {
        match self.store.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter(|k| k.starts_with(config.namespace.as_str()))
                .collect(),
            Err(e) => {
                self.pending.push(CacheEvent::ReadFailed {
                    key: format!("{}*", config.namespace),
                    error: e.to_string(),
                });
                Vec::new()
            }
        }
    }
}

/// Prefixes a logical key with the namespace.
fn namespaced(config: &Config, key: &str) -> String {
    format!("{}{}", config.namespace, key)
}

/// True for stored values a sweep should delete: unparsable text, `null`,
/// and objects whose numeric `expires` is past. Other JSON values carry no
/// expiry and are kept.
fn is_sweepable(raw: &str, now: u64) -> bool {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(fields)) => fields
            .get("expires")
            .and_then(Value::as_f64)
            .is_some_and(|expires| now as f64 > expires),
        Ok(Value::Null) | Err(_) => true,
        Ok(_) => false,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
