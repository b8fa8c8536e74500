//! API Module
//!
//! HTTP handlers and routing for the cache admin REST API.
//!
//! # Endpoints
//! - `GET /fetch?url=..&key=..&ttl=..` - Read-through fetch
//! - `GET /entries/:key` - Read one cached entry
//! - `PUT /entries/:key` - Store an entry
//! - `DELETE /entries/:key` - Remove an entry
//! - `DELETE /entries` - Remove every entry
//! - `POST /invalidate/:key` - Cascade invalidation
//! - `POST /sweep` - Sweep expired entries
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
