//! Simulated ambulance responder pool.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use rescue_domain::Coordinates;

/// A simulated ambulance driver.
#[derive(Debug, Clone)]
pub struct SimulatedResponder {
    pub driver_id: Uuid,
    pub callsign: String,
    pub position: Coordinates,
    pub busy_with: Option<Uuid>,
    pub wins: u32,
    pub losses: u32,
    pub completed: u32,
}

impl SimulatedResponder {
    /// Whether this responder can race for a new alert.
    pub fn is_idle(&self) -> bool {
        self.busy_with.is_none()
    }

    /// Drift the position a little, as a moving ambulance would.
    pub fn drift(&mut self) {
        let mut rng = rand::thread_rng();
        let lat = (self.position.latitude + rng.gen_range(-0.002..0.002)).clamp(-90.0, 90.0);
        let lon = (self.position.longitude + rng.gen_range(-0.002..0.002)).clamp(-180.0, 180.0);
        if let Ok(position) = Coordinates::new(lat, lon) {
            self.position = position;
        }
    }
}

/// Tally row for the end-of-run summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TallyEntry {
    pub callsign: String,
    pub wins: u32,
    pub losses: u32,
    pub completed: u32,
}

/// Pool of simulated responders with race bookkeeping.
pub struct ResponderPool {
    responders: HashMap<Uuid, SimulatedResponder>,
}

impl ResponderPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            responders: HashMap::new(),
        }
    }

    /// Add a registered responder starting at the given position.
    pub fn add(&mut self, driver_id: Uuid, callsign: &str, position: Coordinates) {
        self.responders.insert(
            driver_id,
            SimulatedResponder {
                driver_id,
                callsign: callsign.to_string(),
                position,
                busy_with: None,
                wins: 0,
                losses: 0,
                completed: 0,
            },
        );
    }

    /// All responders currently free to race.
    pub fn idle(&self) -> Vec<SimulatedResponder> {
        self.responders
            .values()
            .filter(|r| r.is_idle())
            .cloned()
            .collect()
    }

    /// All responders currently holding an assignment.
    pub fn busy(&self) -> Vec<SimulatedResponder> {
        self.responders
            .values()
            .filter(|r| !r.is_idle())
            .cloned()
            .collect()
    }

    /// Record a won accept race.
    pub fn record_win(&mut self, driver_id: Uuid, alert_id: Uuid) {
        if let Some(responder) = self.responders.get_mut(&driver_id) {
            responder.busy_with = Some(alert_id);
            responder.wins += 1;
        }
    }

    /// Record a lost accept race.
    pub fn record_loss(&mut self, driver_id: Uuid) {
        if let Some(responder) = self.responders.get_mut(&driver_id) {
            responder.losses += 1;
        }
    }

    /// Record a completed assignment; the responder goes idle again.
    pub fn record_resolution(&mut self, driver_id: Uuid) {
        if let Some(responder) = self.responders.get_mut(&driver_id) {
            responder.busy_with = None;
            responder.completed += 1;
        }
    }

    /// Drift every responder's position.
    pub fn drift_all(&mut self) {
        for responder in self.responders.values_mut() {
            responder.drift();
        }
    }

    /// Get mutable access for targeted updates.
    pub fn get(&self, driver_id: Uuid) -> Option<&SimulatedResponder> {
        self.responders.get(&driver_id)
    }

    /// Assignment tally sorted by wins, busiest first.
    pub fn tally(&self) -> Vec<TallyEntry> {
        let mut entries: Vec<_> = self
            .responders
            .values()
            .map(|r| TallyEntry {
                callsign: r.callsign.clone(),
                wins: r.wins,
                losses: r.losses,
                completed: r.completed,
            })
            .collect();

        entries.sort_by(|a, b| b.wins.cmp(&a.wins).then(a.callsign.cmp(&b.callsign)));
        entries
    }

    /// Total accept attempts across the pool.
    pub fn total_attempts(&self) -> u32 {
        self.responders.values().map(|r| r.wins + r.losses).sum()
    }
}

impl Default for ResponderPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with(n: usize) -> (ResponderPool, Vec<Uuid>) {
        let mut pool = ResponderPool::new();
        let mut ids = Vec::new();
        let position = Coordinates::new(40.7580, -73.9855).unwrap();
        for i in 0..n {
            let id = Uuid::new_v4();
            pool.add(id, &format!("AMB{:03}", i + 1), position);
            ids.push(id);
        }
        (pool, ids)
    }

    #[test]
    fn test_win_makes_responder_busy() {
        let (mut pool, ids) = pool_with(3);
        let alert_id = Uuid::new_v4();

        pool.record_win(ids[0], alert_id);
        pool.record_loss(ids[1]);
        pool.record_loss(ids[2]);

        assert_eq!(pool.idle().len(), 2);
        assert_eq!(pool.busy().len(), 1);
        assert_eq!(pool.get(ids[0]).unwrap().busy_with, Some(alert_id));
    }

    #[test]
    fn test_resolution_frees_responder() {
        let (mut pool, ids) = pool_with(1);
        pool.record_win(ids[0], Uuid::new_v4());
        assert!(pool.idle().is_empty());

        pool.record_resolution(ids[0]);
        assert_eq!(pool.idle().len(), 1);
        assert_eq!(pool.get(ids[0]).unwrap().completed, 1);
    }

    #[test]
    fn test_tally_orders_by_wins() {
        let (mut pool, ids) = pool_with(2);
        pool.record_win(ids[1], Uuid::new_v4());
        pool.record_loss(ids[0]);

        let tally = pool.tally();
        assert_eq!(tally[0].wins, 1);
        assert_eq!(tally[1].wins, 0);
        assert_eq!(pool.total_attempts(), 2);
    }

    #[test]
    fn test_drift_keeps_coordinates_valid() {
        let (mut pool, ids) = pool_with(1);
        for _ in 0..500 {
            pool.drift_all();
        }
        let position = pool.get(ids[0]).unwrap().position;
        assert!(Coordinates::new(position.latitude, position.longitude).is_ok());
    }
}
