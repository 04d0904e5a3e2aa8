//! # GraphQL Output Types
//!
//! Object type definitions for GraphQL responses.

use async_graphql::{ID, Object, SimpleObject};
use chrono::{DateTime, Utc};

use super::enums::*;
use rescue_domain as domain;

// =============================================================================
// VALUE OBJECTS
// =============================================================================

/// Geographic coordinates
#[derive(Debug, Clone, Copy, SimpleObject)]
pub struct Coordinates {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl From<domain::Coordinates> for Coordinates {
    fn from(c: domain::Coordinates) -> Self {
        Self {
            latitude: c.latitude,
            longitude: c.longitude,
        }
    }
}

// =============================================================================
// ALERT
// =============================================================================

/// An emergency alert moving through the dispatch lifecycle
#[derive(Debug, Clone)]
pub struct Alert {
    pub alert_id: String,
    pub alert_type: String,
    pub location: Coordinates,
    pub reported_at: DateTime<Utc>,
    pub details: Option<String>,
    pub impact_magnitude: Option<f64>,
    pub reporter_id: Option<String>,
    pub status: AlertStatus,
    pub resolved: bool,
    pub assigned_driver_id: Option<String>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[Object]
impl Alert {
    /// Unique alert identifier
    async fn id(&self) -> ID {
        ID(self.alert_id.clone())
    }

    /// Incident kind ("ACCIDENT", "MANUAL_SOS", or a free-form label)
    async fn alert_type(&self) -> &str {
        &self.alert_type
    }

    /// Incident location
    async fn location(&self) -> Coordinates {
        self.location
    }

    /// When the alert was reported
    async fn reported_at(&self) -> DateTime<Utc> {
        self.reported_at
    }

    /// Reporter-supplied free text
    async fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Collision impact estimate; only meaningful for accidents
    async fn impact_magnitude(&self) -> Option<f64> {
        self.impact_magnitude
    }

    /// Reporting user, when known
    async fn reporter_id(&self) -> Option<ID> {
        self.reporter_id.clone().map(ID)
    }

    /// Current lifecycle status
    async fn status(&self) -> AlertStatus {
        self.status
    }

    /// Convenience mirror of `status == RESOLVED`
    async fn resolved(&self) -> bool {
        self.resolved
    }

    /// The responder holding (or having held) the assignment
    async fn assigned_driver_id(&self) -> Option<ID> {
        self.assigned_driver_id.clone().map(ID)
    }

    /// When the assignment was claimed; retained after resolution
    async fn accepted_at(&self) -> Option<DateTime<Utc>> {
        self.accepted_at
    }

    /// When the alert was closed
    async fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    /// Seconds the alert has been waiting since it was reported
    async fn age_seconds(&self) -> i64 {
        (Utc::now() - self.reported_at).num_seconds()
    }
}

impl From<domain::Alert> for Alert {
    fn from(a: domain::Alert) -> Self {
        Self {
            alert_id: a.alert_id.to_string(),
            alert_type: a.alert_type.as_str().to_string(),
            location: a.location.into(),
            reported_at: a.reported_at,
            details: a.details,
            impact_magnitude: a.impact_magnitude,
            reporter_id: a.reporter_id.map(|id| id.to_string()),
            status: a.status.into(),
            resolved: a.resolved,
            assigned_driver_id: a.assigned_driver_id.map(|id| id.to_string()),
            accepted_at: a.accepted_at,
            resolved_at: a.resolved_at,
        }
    }
}

// =============================================================================
// DRIVER
// =============================================================================

/// An ambulance driver known to the dispatcher
#[derive(Debug, Clone, SimpleObject)]
pub struct Driver {
    /// Unique driver identifier
    pub id: ID,
    /// Display identifier (e.g. "AMB001")
    pub external_id: Option<String>,
    /// Last reported position
    pub location: Option<Coordinates>,
    /// Whether the driver can accept a new alert right now
    pub is_available: bool,
    /// Registration timestamp
    pub registered_at: DateTime<Utc>,
}

impl From<domain::Driver> for Driver {
    fn from(d: domain::Driver) -> Self {
        Self {
            id: ID(d.driver_id.to_string()),
            external_id: d.external_id,
            location: d.location.map(Coordinates::from),
            is_available: d.is_available,
            registered_at: d.registered_at,
        }
    }
}

// =============================================================================
// SUBSCRIPTION EVENTS
// =============================================================================

/// Alert lifecycle event pushed to subscribers
#[derive(Debug, Clone, SimpleObject)]
pub struct AlertEvent {
    /// What happened
    pub kind: AlertEventKind,
    /// Alert snapshot after the transition
    pub alert: Alert,
    /// When the event was emitted
    pub timestamp: DateTime<Utc>,
}

impl AlertEvent {
    pub fn now(kind: AlertEventKind, alert: Alert) -> Self {
        Self {
            kind,
            alert,
            timestamp: Utc::now(),
        }
    }
}

/// Driver location update pushed to subscribers
#[derive(Debug, Clone, SimpleObject)]
pub struct DriverLocationEvent {
    /// The driver that moved
    pub driver_id: ID,
    /// New position
    pub location: Coordinates,
    /// When the update was recorded
    pub timestamp: DateTime<Utc>,
}
