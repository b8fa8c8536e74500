//! Test doubles shared by the cache unit and property tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::{CacheEvent, CacheManager, EventSink};
use crate::config::Config;
use crate::error::{FetchError, StoreError};
use crate::fetch::{FetchResponse, Fetcher, RequestOptions};
use crate::storage::{KeyValueStore, MemoryStore};

/// Store handle that tests keep a clone of to inspect raw contents.
#[derive(Clone)]
pub struct SharedStore(Arc<Mutex<MemoryStore>>);

impl SharedStore {
    pub fn new(store: MemoryStore) -> Self {
        Self(Arc::new(Mutex::new(store)))
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.0.lock().unwrap().get(key).unwrap()
    }

    pub fn put(&self, key: &str, value: &str) {
        self.0.lock().unwrap().set(key, value).unwrap();
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

impl KeyValueStore for SharedStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.0.lock().unwrap().get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.0.lock().unwrap().set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.0.lock().unwrap().remove(key)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.0.lock().unwrap().keys()
    }
}

/// Store whose every operation fails.
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("disabled".to_string()))
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("disabled".to_string()))
    }

    fn remove(&mut self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("disabled".to_string()))
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Unavailable("disabled".to_string()))
    }
}

/// Fetcher answering every request with the same canned response.
#[derive(Clone)]
pub struct StaticFetcher {
    status: u16,
    body: String,
    delay: Duration,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl StaticFetcher {
    pub fn json(body: &str) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::json("")
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, _url: &str, _options: &RequestOptions) -> Result<FetchResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(FetchError::Transport("connection refused".to_string()));
        }
        Ok(FetchResponse::new(self.status, Vec::new(), self.body.clone().into_bytes()))
    }
}

/// Manager over a fresh in-memory store with default config.
pub fn test_manager() -> (CacheManager, SharedStore) {
    let store = SharedStore::new(MemoryStore::new());
    let manager = CacheManager::new(Config::default(), store.clone(), StaticFetcher::json("[]"));
    (manager, store)
}

/// Event sink recording into a shared vector.
pub fn recording_sink() -> (EventSink, Arc<Mutex<Vec<CacheEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let recorder = events.clone();
    let sink: EventSink = Arc::new(move |event: &CacheEvent| {
        recorder.lock().unwrap().push(event.clone());
    });
    (sink, events)
}
