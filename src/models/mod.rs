//! Request and Response models for the cache admin API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{FetchQuery, SetEntryRequest};
pub use responses::{
    DeleteResponse, EntryResponse, ErrorResponse, HealthResponse, RemovedResponse, SetResponse,
    StatsResponse,
};
