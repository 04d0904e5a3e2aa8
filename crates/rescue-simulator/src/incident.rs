//! Incident generation for dispatch scenarios.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rescue_domain::Coordinates;

/// Onboard sensors flag a collision above this reading.
const IMPACT_THRESHOLD: f64 = 25.0;

/// Simulated incident kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IncidentKind {
    Accident,
    ManualSos,
}

impl IncidentKind {
    /// Wire label matching the dispatch API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accident => "ACCIDENT",
            Self::ManualSos => "MANUAL_SOS",
        }
    }

    /// Get random incident kind; collisions dominate.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        if rng.gen_range(0..10) < 7 {
            Self::Accident
        } else {
            Self::ManualSos
        }
    }
}

/// A generated incident ready to be reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedIncident {
    pub reporter_id: Uuid,
    pub kind: IncidentKind,
    pub latitude: f64,
    pub longitude: f64,
    pub details: String,
    pub impact_magnitude: Option<f64>,
    pub occurred_at: DateTime<Utc>,
}

/// Generates incidents scattered around a city center.
pub struct IncidentGenerator {
    center: Coordinates,
    spread_km: f64,
    scatter: Normal<f64>,
    impact: Normal<f64>,
    counter: u32,
}

impl IncidentGenerator {
    /// Create a generator around the given center.
    pub fn new(center: Coordinates, spread_km: f64) -> Self {
        Self {
            center,
            spread_km,
            scatter: Normal::new(0.0, spread_km).expect("valid scatter sigma"),
            impact: Normal::new(32.0, 6.0).expect("valid impact sigma"),
            counter: 0,
        }
    }

    /// Manhattan preset used by the CLI defaults.
    pub fn manhattan() -> Self {
        Self::new(
            Coordinates::new(40.7580, -73.9855).expect("valid preset center"),
            4.0,
        )
    }

    /// Generate the next incident for the given reporter.
    pub fn next_incident(&mut self, reporter_id: Uuid) -> SimulatedIncident {
        let mut rng = rand::thread_rng();
        self.counter += 1;

        // One degree of latitude is ~111 km; scatter in km, convert back
        let dlat = self.scatter.sample(&mut rng) / 111.0;
        let dlon = self.scatter.sample(&mut rng)
            / (111.0 * self.center.latitude.to_radians().cos().max(0.2));

        let latitude = (self.center.latitude + dlat).clamp(-90.0, 90.0);
        let longitude = (self.center.longitude + dlon).clamp(-180.0, 180.0);

        let kind = IncidentKind::random();
        let impact_magnitude = match kind {
            IncidentKind::Accident => {
                // Below-threshold readings never reach the dispatcher
                Some(self.impact.sample(&mut rng).max(IMPACT_THRESHOLD))
            }
            IncidentKind::ManualSos => None,
        };

        let details = match kind {
            IncidentKind::Accident => {
                format!("simulated collision #{:04}", self.counter)
            }
            IncidentKind::ManualSos => {
                format!("simulated SOS #{:04}", self.counter)
            }
        };

        SimulatedIncident {
            reporter_id,
            kind,
            latitude,
            longitude,
            details,
            impact_magnitude,
            occurred_at: Utc::now(),
        }
    }

    /// Distance from the configured center, for spread checks.
    pub fn distance_from_center_km(&self, incident: &SimulatedIncident) -> f64 {
        let location = Coordinates::new(incident.latitude, incident.longitude)
            .expect("generated coordinates are clamped");
        self.center.distance_to_km(&location)
    }

    /// Configured spread in km.
    pub fn spread_km(&self) -> f64 {
        self.spread_km
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incidents_have_valid_coordinates() {
        let mut generator = IncidentGenerator::manhattan();
        for _ in 0..100 {
            let incident = generator.next_incident(Uuid::new_v4());
            assert!(Coordinates::new(incident.latitude, incident.longitude).is_ok());
        }
    }

    #[test]
    fn test_incidents_cluster_near_center() {
        let mut generator = IncidentGenerator::manhattan();
        let incident = generator.next_incident(Uuid::new_v4());
        // 6 sigma of a 4 km spread, generous to keep this deterministic
        assert!(generator.distance_from_center_km(&incident) < generator.spread_km() * 12.0);
    }

    #[test]
    fn test_impact_magnitude_only_for_accidents() {
        let mut generator = IncidentGenerator::manhattan();
        for _ in 0..100 {
            let incident = generator.next_incident(Uuid::new_v4());
            match incident.kind {
                IncidentKind::Accident => {
                    assert!(incident.impact_magnitude.unwrap() >= IMPACT_THRESHOLD);
                }
                IncidentKind::ManualSos => assert!(incident.impact_magnitude.is_none()),
            }
        }
    }
}
