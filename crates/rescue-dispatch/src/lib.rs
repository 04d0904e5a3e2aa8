//! # Rescue Dispatch Engine
//!
//! The alert dispatch and assignment core of the AutoRescue system.
//!
//! ## Responsibilities
//!
//! - The alert status state machine (`Pending -> Verified -> Dispatched ->
//!   Accepted -> Resolved`) and its transition validation
//! - The race-free accept path: at most one responder per alert, decided by
//!   the store's conditional update, never by luck
//! - Driver availability bookkeeping mirroring active assignments
//! - Read-side listings for the driver pool and reporter views
//!
//! Authentication, transport, and storage mechanics live elsewhere; the
//! engine consumes repository traits and already-validated identity facts.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod queries;

pub use engine::{DispatchEngine, NewAlert};
pub use error::{DispatchError, Result};
