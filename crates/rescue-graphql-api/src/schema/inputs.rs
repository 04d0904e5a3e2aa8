//! # GraphQL Input Types
//!
//! Input object definitions for mutations and queries.

use async_graphql::{ID, InputObject};

// =============================================================================
// ALERT INPUTS
// =============================================================================

/// Input for reporting a new alert
#[derive(Debug, Clone, InputObject)]
pub struct CreateAlertInput {
    /// Incident kind; defaults to "ACCIDENT". Free-form labels are kept.
    pub alert_type: Option<String>,
    /// Latitude in decimal degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in decimal degrees (-180 to 180)
    pub longitude: f64,
    /// Free-text description of the incident
    pub details: Option<String>,
    /// Collision impact estimate from onboard sensors
    pub impact_magnitude: Option<f64>,
}

// =============================================================================
// ASSIGNMENT INPUTS
// =============================================================================

/// Input for a driver claiming a dispatched alert
#[derive(Debug, Clone, InputObject)]
pub struct AcceptAlertInput {
    /// Alert to claim
    pub alert_id: ID,
    /// Claiming driver; must match the caller identity
    pub driver_id: ID,
}

/// Input for the assigned driver closing out an alert
#[derive(Debug, Clone, InputObject)]
pub struct ResolveAlertInput {
    /// Alert to resolve
    pub alert_id: ID,
    /// Resolving driver; must be the assignee
    pub driver_id: ID,
}

// =============================================================================
// DRIVER INPUTS
// =============================================================================

/// Input for updating a driver's position
#[derive(Debug, Clone, InputObject)]
pub struct UpdateDriverLocationInput {
    /// Driver being updated; must match the caller identity
    pub driver_id: ID,
    /// Latitude in decimal degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in decimal degrees (-180 to 180)
    pub longitude: f64,
}

/// Input for registering a new driver
#[derive(Debug, Clone, InputObject)]
pub struct RegisterDriverInput {
    /// Display identifier (e.g. "AMB001")
    pub external_id: Option<String>,
}
