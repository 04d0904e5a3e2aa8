//! # Rescue Persistence Library
//!
//! Persistence layer for the AutoRescue Dispatch Tracking System.
//!
//! ## Architecture
//!
//! This crate implements the Repository pattern with a pluggable Strategy
//! pattern for flexible cache/database access patterns:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Dispatch Engine                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Repository Traits                          │
//! │          (AlertRepository, DriverRepository)                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Cached Repository Wrapper                   │
//! │              (applies read/write strategies)                 │
//! └─────────────────────────────────────────────────────────────┘
//!                    │                   │
//! ┌─────────────────────────┐   ┌──────────────────────────────┐
//! │     Redis Cache         │   │    ScyllaDB / In-Memory      │
//! │ (dispatchable, alerts)  │   │     (Source of Truth)        │
//! └─────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! The conditional-update primitive (`conditional_transition`,
//! `conditional_set_availability`) is the serialization point for all
//! status mutation: ScyllaDB expresses it as a lightweight transaction,
//! the in-memory backend as a single-guard check-and-set. Neither backend
//! ever exposes a torn intermediate state.
//!
//! ## Features
//!
//! - `scylla`: Enable ScyllaDB backend (default)
//! - `redis`: Enable Redis cache layer (default)

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod repository;
pub mod strategy;

#[cfg(feature = "redis")]
pub mod cache;

// Re-export commonly used types
pub use error::{PersistenceError, Result};
pub use repository::{
    AlertRepository, CasOutcome, DriverRepository, InMemoryAlertRepository,
    InMemoryDriverRepository, StatusChange,
};
pub use strategy::{ReadStrategy, WriteStrategy};

#[cfg(feature = "redis")]
pub use cache::{CacheClient, CacheConfig, CacheTtl, SharedCacheClient};
#[cfg(feature = "redis")]
pub use repository::CachedAlertRepository;
#[cfg(feature = "scylla")]
pub use repository::{ScyllaAlertRepository, ScyllaClient, ScyllaConfig, ScyllaDriverRepository};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the persistence layer with default configuration
///
/// # Errors
///
/// Returns an error if either ScyllaDB or Redis connection fails.
#[cfg(all(feature = "scylla", feature = "redis"))]
pub async fn init_default() -> Result<(ScyllaClient, CacheClient)> {
    let scylla = ScyllaClient::new(ScyllaConfig::default()).await?;
    let cache = CacheClient::new(CacheConfig::default()).await?;
    Ok((scylla, cache))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
