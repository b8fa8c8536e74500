//! Cache Module
//!
//! Read-through caching of API responses in a key-value store, with TTL
//! expiry, version gating and cascade invalidation.

mod entry;
mod events;
mod manager;
mod policy;
mod read_through;
mod stats;

#[cfg(test)]
pub(crate) mod testing;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use events::{CacheEvent, EventSink, PurgeReason};
pub use manager::CacheManager;
pub use policy::{
    cascade_prefixes, default_invalidation_rules, default_ttl_policies, key_from_url, lookup_ttl,
    InvalidationRule, TtlPolicy,
};
pub use stats::CacheStats;
