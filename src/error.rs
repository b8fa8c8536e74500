//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Store Error Enum ==
/// Failures reported by a persistent key-value store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The write would exceed the store's capacity
    #[error("Storage quota exceeded")]
    QuotaExceeded,

    /// The store cannot be accessed at all
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Backing file could not be read or written
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backing data could not be decoded
    #[error("Storage corrupt: {0}")]
    Corrupt(String),
}

// == Fetch Error Enum ==
/// Failures reported by a network fetcher.
///
/// These are propagated to the caller of a read-through fetch unchanged.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection, DNS, timeout or other transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The request could not be built (bad URL, bad method)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The response body is not valid JSON
    #[error("Invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            FetchError::InvalidRequest(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

// == Cache Error Enum ==
/// Error type for the admin HTTP API.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Upstream fetch failed
    #[error("Upstream error: {0}")]
    Upstream(#[from] FetchError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Upstream(_) => StatusCode::BAD_GATEWAY,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the admin API.
pub type Result<T> = std::result::Result<T, CacheError>;
