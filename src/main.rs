//! fit_cache - Read-through cache service for FitTracker API responses
//!
//! Serves cached upstream reads and cache administration over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fit_cache::api::{create_router, AppState};
use fit_cache::{CacheManager, Config, FileStore, HttpFetcher, MemoryStore};

/// Main entry point for the cache service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the store and create the cache manager
/// 4. Start the background expiry sweep
/// 5. Serve the router until SIGINT/SIGTERM, then stop the sweep
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fit_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting fit_cache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: namespace={}, version={}, default_ttl={:?}, sweep_interval={:?}, port={}, upstream={}",
        config.namespace,
        config.version,
        config.default_ttl,
        config.sweep_interval,
        config.server_port,
        config.upstream_url
    );

    let fetcher = HttpFetcher::new(config.upstream_url.clone());
    let manager = match &config.storage_path {
        Some(path) => {
            let store = FileStore::open(path, config.storage_quota)
                .with_context(|| format!("opening store at {}", path.display()))?;
            info!("Using file store at {}", path.display());
            CacheManager::new(config.clone(), store, fetcher)
        }
        None => {
            warn!("No storage path available, entries will not survive a restart");
            let store = match config.storage_quota {
                Some(quota) => MemoryStore::with_quota(quota),
                None => MemoryStore::new(),
            };
            CacheManager::new(config.clone(), store, fetcher)
        }
    };
    let manager = Arc::new(manager);

    manager.start_sweeper();
    info!("Background sweep task started");

    let app = create_router(AppState::new(manager.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(manager))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops the sweep task.
async fn shutdown_signal(manager: Arc<CacheManager>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    manager.shutdown();
}
