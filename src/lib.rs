//! fit_cache - Read-through cache for FitTracker API responses
//!
//! Caches JSON responses in a key-value store with TTL expiry, version
//! gating, cascade invalidation and a background expiry sweep.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod storage;
pub mod tasks;

pub use api::AppState;
pub use cache::CacheManager;
pub use config::Config;
pub use fetch::{FetchResponse, Fetcher, HttpFetcher, RequestOptions};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
