//! Read-Through Fetch
//!
//! Serves idempotent reads from the cache and fills it from the network.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::events::CacheEvent;
use crate::cache::manager::CacheManager;
use crate::cache::policy::key_from_url;
use crate::error::FetchError;
use crate::fetch::{FetchResponse, RequestOptions};

impl CacheManager {
    // == Cached Fetch ==
    /// Fetches `url`, answering GET requests from the cache when possible.
    ///
    /// The cache key is `cache_key`, or one derived from the URL. On a hit
    /// the fetcher is not called and the response has `cached == true`. On
    /// a miss the fetcher's response is returned as is, and its JSON body is
    /// stored when the response is ok. Non-GET requests bypass the cache
    /// entirely; callers invalidate affected keys themselves.
    ///
    /// Fetch errors are returned unchanged; stale entries are never served
    /// as a fallback.
    pub async fn cached_fetch(
        &self,
        url: &str,
        options: &RequestOptions,
        cache_key: Option<&str>,
        ttl: Option<Duration>,
    ) -> Result<FetchResponse, FetchError> {
        if !options.is_cacheable() {
            debug!("Bypassing cache for {} {}", options.method_or_default(), url);
            return self.fetcher.fetch(url, options).await;
        }

        let key = cache_key.map_or_else(|| key_from_url(url), str::to_string);

        if !self.config.coalesce_requests {
            return self.lookup_or_fetch(url, options, &key, ttl).await;
        }

        // concurrent callers for one key queue here; later ones find the entry stored
        let slot = InFlightSlot::claim(self, &key);
        let _turn = slot.gate.lock().await;
        self.lookup_or_fetch(url, options, &key, ttl).await
    }

    async fn lookup_or_fetch(
        &self,
        url: &str,
        options: &RequestOptions,
        key: &str,
        ttl: Option<Duration>,
    ) -> Result<FetchResponse, FetchError> {
        if let Some(data) = self.get(key) {
            return Ok(FetchResponse::from_cache(data));
        }

        debug!("Fetching {} for {}", url, key);
        let response = self.fetcher.fetch(url, options).await?;

        if response.ok {
            match response.json() {
                Ok(data) => {
                    self.set(key, data, ttl);
                }
                Err(e) => self.emit(CacheEvent::NotCacheable {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
            }
        }

        Ok(response)
    }
}

/// Membership in the per-key in-flight table.
///
/// Removes the key's gate on drop once no other caller holds it.
struct InFlightSlot<'a> {
    manager: &'a CacheManager,
    key: String,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl<'a> InFlightSlot<'a> {
    fn claim(manager: &'a CacheManager, key: &str) -> Self {
        let gate = manager
            .in_flight
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(key.to_string())
            .or_default()
            .clone();

        Self {
            manager,
            key: key.to_string(),
            gate,
        }
    }
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        let mut in_flight = self
            .manager
            .in_flight
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        // one reference in the table, one here
        if Arc::strong_count(&self.gate) <= 2 {
            in_flight.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::{recording_sink, SharedStore, StaticFetcher};
    use crate::config::Config;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn manager_with(fetcher: StaticFetcher, config: Config) -> (Arc<CacheManager>, SharedStore) {
        let store = SharedStore::new(MemoryStore::new());
        let manager = CacheManager::new(config, store.clone(), fetcher);
        (Arc::new(manager), store)
    }

    #[tokio::test]
    async fn test_second_get_is_served_from_cache() {
        let fetcher = StaticFetcher::json(r#"[{"name":"squat"},{"name":"deadlift"}]"#);
        let (manager, _store) = manager_with(fetcher.clone(), Config::default());

        let first = manager
            .cached_fetch("/api/exercises", &RequestOptions::get(), None, None)
            .await
            .unwrap();
        let second = manager
            .cached_fetch("/api/exercises", &RequestOptions::get(), None, None)
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.json().unwrap(), second.json().unwrap());
    }

    #[tokio::test]
    async fn test_url_derived_key() {
        let (manager, store) = manager_with(StaticFetcher::json("{}"), Config::default());

        manager
            .cached_fetch("/api/profile?id=7", &RequestOptions::get(), None, None)
            .await
            .unwrap();

        assert!(store.raw("fitTracker_cache__api_profile_id_7").is_some());
    }

    #[tokio::test]
    async fn test_explicit_key_and_ttl() {
        let (manager, _store) = manager_with(StaticFetcher::json("{}"), Config::default());

        manager
            .cached_fetch(
                "/api/profile",
                &RequestOptions::get(),
                Some("profile"),
                Some(Duration::from_secs(42)),
            )
            .await
            .unwrap();

        let entry = manager.get_entry("profile").unwrap();
        assert_eq!(entry.expires, Some(entry.cached_at + 42_000));
    }

    #[tokio::test]
    async fn test_post_bypasses_cache() {
        let fetcher = StaticFetcher::json(r#"{"saved":true}"#);
        let (manager, store) = manager_with(fetcher.clone(), Config::default());
        manager.set("profile", json!({"stale": true}), None);

        let options = RequestOptions::with_method("POST").body(r#"{"age":31}"#);
        let response = manager
            .cached_fetch("/api/profile", &options, Some("profile"), None)
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert!(!response.cached);
        assert_eq!(response.json().unwrap(), json!({"saved": true}));
        // nothing consulted, nothing written, nothing invalidated
        assert_eq!(manager.get("profile"), Some(json!({"stale": true})));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_error_status_is_returned_but_not_cached() {
        let fetcher = StaticFetcher::with_status(500, r#"{"error":"boom"}"#);
        let (manager, store) = manager_with(fetcher.clone(), Config::default());

        let response = manager
            .cached_fetch("/api/exercises", &RequestOptions::get(), None, None)
            .await
            .unwrap();

        assert!(!response.ok);
        assert_eq!(response.status, 500);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_non_json_body_skips_caching() {
        let fetcher = StaticFetcher::json("<html>maintenance</html>");
        let (sink, events) = recording_sink();
        let store = SharedStore::new(MemoryStore::new());
        let manager = CacheManager::new(Config::default(), store.clone(), fetcher.clone())
            .with_event_sink(sink);

        let response = manager
            .cached_fetch("/api/exercises", &RequestOptions::get(), None, None)
            .await
            .unwrap();

        assert!(response.ok);
        assert_eq!(response.text(), "<html>maintenance</html>");
        assert_eq!(store.len(), 0);
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, CacheEvent::NotCacheable { .. })));
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let (manager, _store) = manager_with(StaticFetcher::failing(), Config::default());

        let result = manager
            .cached_fetch("/api/exercises", &RequestOptions::get(), None, None)
            .await;

        assert!(matches!(result, Err(FetchError::Transport(_))));
    }

    #[tokio::test]
    async fn test_fetch_error_does_not_serve_expired_entry() {
        let (manager, _store) = manager_with(StaticFetcher::failing(), Config::default());
        manager.set("exercises", json!(["old"]), Some(Duration::from_millis(5)));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let result = manager
            .cached_fetch("/api/exercises", &RequestOptions::get(), Some("exercises"), None)
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_fetches_are_coalesced() {
        let fetcher = StaticFetcher::json("[1,2,3]").delayed(Duration::from_millis(50));
        let (manager, _store) = manager_with(fetcher.clone(), Config::default());

        let options = RequestOptions::get();
        let (a, b) = tokio::join!(
            manager.cached_fetch("/api/exercises", &options, None, None),
            manager.cached_fetch("/api/exercises", &options, None, None),
        );

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(a.unwrap().json().unwrap(), b.unwrap().json().unwrap());
        assert!(manager.in_flight.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_fetches_without_coalescing() {
        let fetcher = StaticFetcher::json("[1,2,3]").delayed(Duration::from_millis(50));
        let config = Config {
            coalesce_requests: false,
            ..Config::default()
        };
        let (manager, _store) = manager_with(fetcher.clone(), config);

        let options = RequestOptions::get();
        let (a, b) = tokio::join!(
            manager.cached_fetch("/api/exercises", &options, None, None),
            manager.cached_fetch("/api/exercises", &options, None, None),
        );

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(fetcher.calls(), 2);
    }
}
