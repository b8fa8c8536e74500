//! Diagnostic Events
//!
//! Structured record of every cache decision and swallowed failure, so
//! callers can observe the best-effort paths without parsing log text.

use std::fmt;
use std::sync::Arc;

/// Why a stored entry was discarded on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeReason {
    Expired,
    VersionMismatch,
    Corrupt,
}

/// A cache-layer event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    Hit { key: String },
    Miss { key: String },
    Purged { key: String, reason: PurgeReason },
    Stored { key: String },
    /// The store could not be read; treated as a miss
    ReadFailed { key: String, error: String },
    /// First write attempt hit the quota; a sweep and retry follow
    QuotaExceeded { key: String },
    /// The write was given up; the caller is unaffected
    WriteAbandoned { key: String, error: String },
    /// A cacheable response could not be stored
    NotCacheable { key: String, reason: String },
    RemoveFailed { key: String, error: String },
    Invalidated { key: String, prefixes: Vec<String> },
    Swept { removed: usize },
}

/// Callback receiving cache events.
pub type EventSink = Arc<dyn Fn(&CacheEvent) + Send + Sync>;

impl fmt::Display for PurgeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            PurgeReason::Expired => "expired",
            PurgeReason::VersionMismatch => "version mismatch",
            PurgeReason::Corrupt => "corrupt",
        };
        f.write_str(reason)
    }
}
