//! Expiry Sweep Task
//!
//! Background task that periodically removes expired cache entries.

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::CacheManager;

/// Spawns a background task that sweeps expired entries from the cache.
///
/// The first sweep runs immediately, then one every `interval`. The task
/// holds only a weak reference and exits once the manager is dropped.
///
/// # Arguments
/// * `manager` - Weak reference to the owning cache manager
/// * `interval` - Time between sweeps, must be non-zero
///
/// # Returns
/// A JoinHandle for the spawned task, used by the manager to abort it on
/// shutdown.
pub fn spawn_sweep_task(manager: Weak<CacheManager>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting cache sweep task with interval of {:?}", interval);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let Some(manager) = manager.upgrade() else {
                debug!("Cache manager dropped, stopping sweep task");
                break;
            };
            manager.sweep_expired();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::test_manager;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_sweep_task_removes_expired_entries() {
        let (manager, store) = test_manager();
        let manager = Arc::new(manager);
        manager.set("expire_soon", json!("value"), Some(Duration::from_millis(10)));

        let handle = spawn_sweep_task(Arc::downgrade(&manager), Duration::from_millis(50));

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(store.raw("fitTracker_cache_expire_soon").is_none());
        assert!(manager.stats().swept >= 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_preserves_valid_entries() {
        let (manager, _store) = test_manager();
        let manager = Arc::new(manager);
        manager.set("long_lived", json!("value"), Some(Duration::from_secs(3600)));

        let handle = spawn_sweep_task(Arc::downgrade(&manager), Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(manager.get("long_lived"), Some(json!("value")));

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_runs_at_start() {
        let (manager, store) = test_manager();
        store.put("fitTracker_cache_corrupt", "{{");
        let manager = Arc::new(manager);

        let handle = spawn_sweep_task(Arc::downgrade(&manager), Duration::from_secs(600));

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(store.raw("fitTracker_cache_corrupt").is_none());
        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_stops_when_manager_dropped() {
        let (manager, _store) = test_manager();
        let manager = Arc::new(manager);

        let handle = spawn_sweep_task(Arc::downgrade(&manager), Duration::from_millis(10));
        drop(manager);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should exit once the manager is gone");
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let (manager, _store) = test_manager();
        let manager = Arc::new(manager);

        let handle = spawn_sweep_task(Arc::downgrade(&manager), Duration::from_secs(1));
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
