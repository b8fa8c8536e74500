//! API Routes
//!
//! Configures the Axum router with all cache admin endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_entry_handler, fetch_handler, get_entry_handler, health_handler,
    invalidate_handler, set_entry_handler, stats_handler, sweep_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /fetch?url=..` - Read-through fetch of an upstream path
/// - `GET|PUT|DELETE /entries/:key` - Inspect, store or remove one entry
/// - `DELETE /entries` - Remove every entry
/// - `POST /invalidate/:key` - Cascade invalidation
/// - `POST /sweep` - Remove expired entries now
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin, the front-end is served from another port
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/fetch", get(fetch_handler))
        .route("/entries", axum::routing::delete(clear_handler))
        .route(
            "/entries/:key",
            get(get_entry_handler)
                .put(set_entry_handler)
                .delete(delete_entry_handler),
        )
        .route("/invalidate/:key", post(invalidate_handler))
        .route("/sweep", post(sweep_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
