//! Request DTOs for the cache admin API
//!
//! Defines the structure of incoming HTTP request bodies and queries.

use serde::Deserialize;
use serde_json::Value;

/// Request body for storing an entry (PUT /entries/:key)
///
/// # Fields
/// - `data`: The JSON payload to cache
/// - `ttl`: Optional TTL in seconds; 0 = never expires, absent = policy default
#[derive(Debug, Clone, Deserialize)]
pub struct SetEntryRequest {
    pub data: Value,
    #[serde(default)]
    pub ttl: Option<u64>,
}

/// Query string for a read-through fetch (GET /fetch)
#[derive(Debug, Clone, Deserialize)]
pub struct FetchQuery {
    /// Upstream path, e.g. `/api/exercises`
    pub url: String,
    /// Cache key override, derived from `url` when absent
    #[serde(default)]
    pub key: Option<String>,
    /// TTL override in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl FetchQuery {
    /// Validates the query
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if !self.url.starts_with('/') {
            return Some("url must be an upstream path starting with '/'".to_string());
        }
        if matches!(&self.key, Some(key) if key.is_empty()) {
            return Some("key cannot be empty".to_string());
        }
        None
    }
}

/// Validates a cache key taken from the path
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_entry_request_deserialize() {
        let json = r#"{"data": {"kcal": 2100}}"#;
        let req: SetEntryRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.data["kcal"], 2100);
        assert!(req.ttl.is_none());
    }

    #[test]
    fn test_set_entry_request_with_ttl() {
        let json = r#"{"data": [], "ttl": 60}"#;
        let req: SetEntryRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl, Some(60));
    }

    #[test]
    fn test_fetch_query_validate() {
        let ok = FetchQuery {
            url: "/api/exercises".to_string(),
            key: None,
            ttl: None,
        };
        assert!(ok.validate().is_none());

        let absolute = FetchQuery {
            url: "http://evil.example/".to_string(),
            ..ok.clone()
        };
        assert!(absolute.validate().is_some());

        let empty_key = FetchQuery {
            key: Some(String::new()),
            ..ok
        };
        assert!(empty_key.validate().is_some());
    }
}
