//! # Strategy Module
//!
//! Enum-based cache/database access strategies using dispatch pattern.
//!
//! ## Available Strategies
//!
//! ### Read Strategies
//! - `CacheFirst` - Check cache, fall back to DB on miss (default)
//! - `DbOnly` - Skip cache entirely
//! - `ReadThrough` - Always read DB, populate cache
//!
//! ### Write Strategies
//! - `WriteAround` - Write DB only, invalidate cache (default; status
//!   transitions must never leave a stale dispatchable list behind)
//! - `WriteThrough` - Write to both cache and DB synchronously
//! - `DbOnly` - Write DB only, no cache interaction

pub mod read_strategy;
pub mod write_strategy;

pub use read_strategy::{CacheError, DbError, ReadError, ReadStrategy};
pub use write_strategy::{WriteError, WriteStrategy};
