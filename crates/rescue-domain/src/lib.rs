//! # AutoRescue Dispatch Tracking System - Domain Model
//!
//! Core domain entities, value objects, and enums for emergency alert
//! dispatch operations. These types are the single source of truth across
//! all layers: persistence, dispatch engine, and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =============================================================================
// VALUE OBJECTS
// =============================================================================

/// Geographic coordinates of an incident or responder
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Create validated coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidCoordinates`] when latitude is outside
    /// -90..=90 or longitude is outside -180..=180 (NaN included).
    pub fn new(lat: f64, lon: f64) -> Result<Self, DomainError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(DomainError::InvalidCoordinates { lat, lon });
        }
        Ok(Self {
            latitude: lat,
            longitude: lon,
        })
    }

    /// Calculate great-circle distance to another point (Haversine formula)
    #[must_use]
    pub fn distance_to_km(&self, other: &Coordinates) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;

        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }
}

// =============================================================================
// ENUMS
// =============================================================================

/// What kind of incident raised the alert
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    /// Vehicle collision detected by onboard sensors
    Accident,
    /// Manually triggered SOS
    ManualSos,
    /// Free-form label supplied by the reporter
    Other(String),
}

impl AlertType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Accident => "ACCIDENT",
            Self::ManualSos => "MANUAL_SOS",
            Self::Other(label) => label.as_str(),
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ACCIDENT" => Self::Accident,
            "MANUAL_SOS" => Self::ManualSos,
            other => Self::Other(other.to_string()),
        })
    }
}

/// Alert lifecycle status
///
/// The dispatcher path is strictly `Pending -> Verified -> Dispatched ->
/// Accepted -> Resolved`. The only permitted skip is the administrative
/// early closure of an alert that has not been accepted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Pending,
    Verified,
    Dispatched,
    Accepted,
    Resolved,
}

impl AlertStatus {
    /// Whether `next` is a legal successor of `self`.
    ///
    /// Encodes the full transition table, including the admin shortcut
    /// from any pre-accept state straight to `Resolved`.
    #[must_use]
    pub fn can_transition_to(self, next: AlertStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Verified)
                | (Self::Verified, Self::Dispatched)
                | (Self::Dispatched, Self::Accepted)
                | (Self::Accepted, Self::Resolved)
                | (Self::Pending, Self::Resolved)
                | (Self::Verified, Self::Resolved)
                | (Self::Dispatched, Self::Resolved)
        )
    }

    /// Resolved is the single terminal state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Verified => "VERIFIED",
            Self::Dispatched => "DISPATCHED",
            Self::Accepted => "ACCEPTED",
            Self::Resolved => "RESOLVED",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "VERIFIED" => Ok(Self::Verified),
            "DISPATCHED" => Ok(Self::Dispatched),
            "ACCEPTED" => Ok(Self::Accepted),
            "RESOLVED" => Ok(Self::Resolved),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

// =============================================================================
// ENTITY TYPES
// =============================================================================

/// Alert entity - a reported incident moving through the dispatch lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: Uuid,
    pub alert_type: AlertType,
    pub location: Coordinates,
    pub reported_at: DateTime<Utc>,

    // Reporter-supplied context
    pub details: Option<String>,
    pub impact_magnitude: Option<f64>,
    pub reporter_id: Option<Uuid>,

    // Lifecycle state, written only by the dispatch engine
    pub status: AlertStatus,
    pub resolved: bool,
    pub assigned_driver_id: Option<Uuid>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Create a new pending alert.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidCoordinates`] for out-of-range input.
    pub fn new(
        alert_type: AlertType,
        lat: f64,
        lon: f64,
        details: Option<String>,
        impact_magnitude: Option<f64>,
        reporter_id: Option<Uuid>,
    ) -> Result<Self, DomainError> {
        let location = Coordinates::new(lat, lon)?;
        Ok(Self {
            alert_id: Uuid::new_v4(),
            alert_type,
            location,
            reported_at: Utc::now(),
            details,
            impact_magnitude,
            reporter_id,
            status: AlertStatus::Pending,
            resolved: false,
            assigned_driver_id: None,
            accepted_at: None,
            resolved_at: None,
        })
    }

    /// An assignment is active while the alert is accepted but unresolved.
    #[must_use]
    pub fn has_active_assignment(&self) -> bool {
        self.status == AlertStatus::Accepted && self.assigned_driver_id.is_some()
    }

    /// Check the assignment bookkeeping invariant:
    /// `assigned_driver_id` is set iff the alert is accepted, or was
    /// accepted before being resolved (`accepted_at` is retained for audit).
    #[must_use]
    pub fn assignment_invariant_holds(&self) -> bool {
        match self.status {
            AlertStatus::Accepted => {
                self.assigned_driver_id.is_some() && self.accepted_at.is_some()
            }
            AlertStatus::Resolved => {
                self.resolved
                    && self.resolved_at.is_some()
                    && (self.assigned_driver_id.is_some() == self.accepted_at.is_some())
            }
            _ => {
                !self.resolved
                    && self.assigned_driver_id.is_none()
                    && self.accepted_at.is_none()
                    && self.resolved_at.is_none()
            }
        }
    }
}

/// Driver entity - an ambulance responder known to the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub driver_id: Uuid,
    /// Display identifier (e.g. "AMB001")
    pub external_id: Option<String>,
    /// Last reported position; unset until the first location update
    pub location: Option<Coordinates>,
    /// False exactly while the driver holds an active assignment
    pub is_available: bool,
    pub registered_at: DateTime<Utc>,
}

impl Driver {
    /// Register a new driver, available by default.
    #[must_use]
    pub fn new(external_id: Option<String>) -> Self {
        Self {
            driver_id: Uuid::new_v4(),
            external_id,
            location: None,
            is_available: true,
            registered_at: Utc::now(),
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Domain-level errors
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Invalid coordinates: lat={lat}, lon={lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: AlertStatus, to: AlertStatus },

    #[error("Unknown alert status: {0}")]
    UnknownStatus(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_validation() {
        assert!(Coordinates::new(40.7128, -74.0060).is_ok());
        assert!(Coordinates::new(90.0, 180.0).is_ok());
        assert!(Coordinates::new(-90.0, -180.0).is_ok());
        assert!(Coordinates::new(91.0, 0.0).is_err());
        assert!(Coordinates::new(0.0, -180.5).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_distance_known_pair() {
        // NYC to Philadelphia, roughly 130 km
        let nyc = Coordinates::new(40.7128, -74.0060).unwrap();
        let phl = Coordinates::new(39.9526, -75.1652).unwrap();
        let d = nyc.distance_to_km(&phl);
        assert!(d > 120.0 && d < 140.0, "unexpected distance: {d}");
    }

    #[test]
    fn test_dispatcher_path_is_forward_only() {
        use AlertStatus::*;
        assert!(Pending.can_transition_to(Verified));
        assert!(Verified.can_transition_to(Dispatched));
        assert!(Dispatched.can_transition_to(Accepted));
        assert!(Accepted.can_transition_to(Resolved));

        // No backward or skipping moves on the dispatcher path
        assert!(!Verified.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Dispatched));
        assert!(!Pending.can_transition_to(Accepted));
        assert!(!Verified.can_transition_to(Accepted));
        assert!(!Resolved.can_transition_to(Pending));
        assert!(!Accepted.can_transition_to(Dispatched));
    }

    #[test]
    fn test_admin_shortcut_only_before_accept() {
        use AlertStatus::*;
        assert!(Pending.can_transition_to(Resolved));
        assert!(Verified.can_transition_to(Resolved));
        assert!(Dispatched.can_transition_to(Resolved));
        // Accepted alerts resolve through the assignee path, which is the
        // same edge; Resolved itself is terminal.
        assert!(!Resolved.can_transition_to(Resolved));
        assert!(Resolved.is_terminal());
        assert!(!Dispatched.is_terminal());
    }

    #[test]
    fn test_status_parse_round_trip() {
        for status in [
            AlertStatus::Pending,
            AlertStatus::Verified,
            AlertStatus::Dispatched,
            AlertStatus::Accepted,
            AlertStatus::Resolved,
        ] {
            assert_eq!(status.as_str().parse::<AlertStatus>().unwrap(), status);
        }
        assert!("HOVERING".parse::<AlertStatus>().is_err());
    }

    #[test]
    fn test_alert_type_preserves_free_form_labels() {
        let parsed: AlertType = "Test Alert".parse().unwrap();
        assert_eq!(parsed, AlertType::Other("Test Alert".to_string()));
        assert_eq!(parsed.as_str(), "Test Alert");
        assert_eq!("ACCIDENT".parse::<AlertType>().unwrap(), AlertType::Accident);
    }

    #[test]
    fn test_new_alert_is_pending_and_consistent() {
        let alert = Alert::new(
            AlertType::Accident,
            40.7128,
            -74.0060,
            Some("two vehicles".to_string()),
            Some(30.5),
            Some(Uuid::new_v4()),
        )
        .unwrap();

        assert_eq!(alert.status, AlertStatus::Pending);
        assert!(!alert.resolved);
        assert!(alert.assignment_invariant_holds());
        assert!(!alert.has_active_assignment());
    }

    #[test]
    fn test_new_alert_rejects_bad_coordinates() {
        let result = Alert::new(AlertType::ManualSos, 91.0, 0.0, None, None, None);
        assert!(matches!(
            result,
            Err(DomainError::InvalidCoordinates { .. })
        ));
    }
}
