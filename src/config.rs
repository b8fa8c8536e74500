//! Configuration Module
//!
//! Handles loading and managing cache and server configuration from
//! environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;

use crate::cache::{default_invalidation_rules, default_ttl_policies, InvalidationRule, TtlPolicy};

/// Default namespace prepended to every cache key.
pub const DEFAULT_NAMESPACE: &str = "fitTracker_cache_";

/// Default entry format version.
pub const DEFAULT_VERSION: &str = "1.0";

/// Default browser-like storage quota (5 MiB).
pub const DEFAULT_STORAGE_QUOTA: usize = 5 * 1024 * 1024;

/// Cache manager and server configuration.
///
/// Scalar values can be configured via environment variables with sensible
/// defaults. The TTL table and invalidation rules are set in code.
#[derive(Debug, Clone)]
pub struct Config {
    /// Prefix isolating this cache's keys from other data in the store
    pub namespace: String,
    /// Entry format version; entries written under another version read as absent
    pub version: String,
    /// TTL used when neither the caller nor the policy table supply one
    pub default_ttl: Duration,
    /// Per-category TTL defaults
    pub ttl_policies: Vec<TtlPolicy>,
    /// Ordered cascade rules applied by `invalidate`
    pub invalidation_rules: Vec<InvalidationRule>,
    /// Interval between background sweeps of expired entries
    pub sweep_interval: Duration,
    /// Merge concurrent read-through fetches for the same key
    pub coalesce_requests: bool,
    /// HTTP server port
    pub server_port: u16,
    /// Base URL that relative fetch URLs are resolved against
    pub upstream_url: String,
    /// Backing file for the durable store; `None` keeps entries in memory
    pub storage_path: Option<PathBuf>,
    /// Maximum bytes the store may hold, `None` for unbounded
    pub storage_quota: Option<usize>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_PREFIX` - Key namespace (default: fitTracker_cache_)
    /// - `CACHE_VERSION` - Entry version tag (default: 1.0)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 600)
    /// - `COALESCE_REQUESTS` - Merge concurrent fetches (default: true)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `UPSTREAM_URL` - API base URL (default: http://localhost:5000)
    /// - `STORAGE_PATH` - Store file (default: platform cache dir)
    /// - `STORAGE_QUOTA_BYTES` - Store quota, 0 for unbounded (default: 5 MiB)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let storage_quota = match parse_var::<usize>("STORAGE_QUOTA_BYTES") {
            Some(0) => None,
            Some(bytes) => Some(bytes),
            None => defaults.storage_quota,
        };

        Self {
            namespace: env::var("CACHE_PREFIX").unwrap_or(defaults.namespace),
            version: env::var("CACHE_VERSION").unwrap_or(defaults.version),
            default_ttl: parse_var("DEFAULT_TTL")
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_ttl),
            sweep_interval: parse_var("SWEEP_INTERVAL")
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            coalesce_requests: parse_var("COALESCE_REQUESTS").unwrap_or(defaults.coalesce_requests),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            upstream_url: env::var("UPSTREAM_URL").unwrap_or(defaults.upstream_url),
            storage_path: env::var("STORAGE_PATH")
                .ok()
                .map(PathBuf::from)
                .or_else(default_storage_path),
            storage_quota,
            ..defaults
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            version: DEFAULT_VERSION.to_string(),
            default_ttl: Duration::from_secs(5 * 60),
            ttl_policies: default_ttl_policies(),
            invalidation_rules: default_invalidation_rules(),
            sweep_interval: Duration::from_secs(10 * 60),
            coalesce_requests: true,
            server_port: 3000,
            upstream_url: "http://localhost:5000".to_string(),
            storage_path: None,
            storage_quota: Some(DEFAULT_STORAGE_QUOTA),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn default_storage_path() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("", "", "fit_cache")?;
    Some(dirs.cache_dir().join("storage.json"))
}
