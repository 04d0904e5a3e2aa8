//! # Repository Module
//!
//! Repository pattern implementations for domain entity persistence.

pub mod memory;
pub mod traits;

#[cfg(feature = "redis")]
pub mod cached;
#[cfg(feature = "scylla")]
pub mod scylla_impl;

pub use memory::{InMemoryAlertRepository, InMemoryDriverRepository};
pub use traits::{AlertRepository, CasOutcome, DriverRepository, StatusChange};

#[cfg(feature = "redis")]
pub use cached::CachedAlertRepository;
#[cfg(feature = "scylla")]
pub use scylla_impl::{
    ScyllaAlertRepository, ScyllaClient, ScyllaConfig, ScyllaDriverRepository,
};
