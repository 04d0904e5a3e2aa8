//! # Rescue Simulator
//!
//! Incident and responder simulator for testing the AutoRescue dispatch
//! system under concurrent load.
//!
//! ## Features
//!
//! - Randomized incident generation around a city center
//! - A pool of simulated ambulance drivers racing to accept alerts
//! - Concurrent accept storms to probe the one-winner guarantee
//! - Per-driver assignment tally

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod incident;
pub mod responder;

pub use incident::IncidentGenerator;
pub use responder::ResponderPool;
