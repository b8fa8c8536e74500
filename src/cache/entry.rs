//! Cache Entry Module
//!
//! Defines the persisted wire format of a cached payload with TTL and
//! version metadata.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// A single cached payload as stored verbatim in the key-value store.
///
/// Serializes to `{"version":..,"data":..,"expires":..,"cachedAt":..}`;
/// `expires` is omitted for entries that never expire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Format-compatibility tag
    pub version: String,
    /// The cached payload
    pub data: Value,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<u64>,
    /// Creation timestamp (Unix milliseconds)
    #[serde(rename = "cachedAt")]
    pub cached_at: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    ///
    /// # Arguments
    /// * `version` - Version tag of the writing manager
    /// * `data` - The payload to store
    /// * `ttl` - Optional lifetime, None = never expires
    pub fn new(version: impl Into<String>, data: Value, ttl: Option<Duration>) -> Self {
        let now = current_timestamp_ms();
        let expires = ttl.map(|ttl| {
            let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
            now.saturating_add(millis)
        });

        Self {
            version: version.into(),
            data,
            expires,
            cached_at: now,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at the given instant.
    ///
    /// An entry is expired once `now` is strictly past its expiry timestamp.
    pub fn is_expired_at(&self, now: u64) -> bool {
        match self.expires {
            Some(expires) => now > expires,
            None => false,
        }
    }

    /// Checks if the entry has expired now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }

    // == Wire Format ==
    /// Serializes the entry into its stored string form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parses an entry from its stored string form.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}
