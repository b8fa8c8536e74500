//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache manager
//! is alive.
//!
//! # Tasks
//! - Expiry Sweep: Removes expired cache entries at configured intervals

mod sweep;

pub use sweep::spawn_sweep_task;
