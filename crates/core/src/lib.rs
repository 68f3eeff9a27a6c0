//! Persistent time-expiring key-value cache.
//!
//! This crate provides:
//! - The `Cache` contract with lazy expiration and atomic upserts
//! - A SQLite backend storing one namespace per file
//! - A provider that picks a backend by configured driver name
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod provider;

pub use cache::{Cache, CacheExt, Fallback, Produced, SqliteCache};
pub use config::CacheConfig;
pub use error::Error;
pub use provider::{Registry, provide_cache};
