//! The alert dispatch and assignment engine.
//!
//! Owns every write to `Alert.status`, the assignment bookkeeping fields,
//! and `Driver.is_available`. All mutation goes through the repositories'
//! conditional-update primitive, so concurrent callers serialize at the
//! store and never observe a torn state. Identity and role facts arrive as
//! already-validated parameters; the engine holds no session state.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{DispatchError, Result};
use rescue_domain::{Alert, AlertStatus, AlertType, Coordinates, Driver};
use rescue_persistence::{
    AlertRepository, CasOutcome, DriverRepository, StatusChange,
};

/// Reporter-supplied fields for a new alert.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub alert_type: AlertType,
    pub latitude: f64,
    pub longitude: f64,
    pub details: Option<String>,
    pub impact_magnitude: Option<f64>,
    pub reporter_id: Option<Uuid>,
}

/// The dispatch engine. Cheap to clone; repositories are shared.
#[derive(Clone)]
pub struct DispatchEngine {
    alerts: Arc<dyn AlertRepository>,
    drivers: Arc<dyn DriverRepository>,
}

impl DispatchEngine {
    /// Create an engine over the given repositories.
    pub fn new(alerts: Arc<dyn AlertRepository>, drivers: Arc<dyn DriverRepository>) -> Self {
        Self { alerts, drivers }
    }

    pub(crate) fn alert_repo(&self) -> &Arc<dyn AlertRepository> {
        &self.alerts
    }

    // =========================================================================
    // LOOKUPS
    // =========================================================================

    /// Fetch an alert, erroring on an unknown id.
    pub async fn get_alert(&self, alert_id: Uuid) -> Result<Alert> {
        self.alerts
            .get(alert_id)
            .await
            .map_err(DispatchError::from_store)?
            .ok_or_else(|| DispatchError::not_found("Alert", alert_id))
    }

    /// Fetch a driver, erroring on an unknown id.
    pub async fn get_driver(&self, driver_id: Uuid) -> Result<Driver> {
        self.drivers
            .get(driver_id)
            .await
            .map_err(DispatchError::from_store)?
            .ok_or_else(|| DispatchError::not_found("Driver", driver_id))
    }

    // =========================================================================
    // ALERT LIFECYCLE
    // =========================================================================

    /// Create a new pending alert.
    ///
    /// Coordinates are validated before anything touches the store; an
    /// out-of-range report persists nothing.
    pub async fn create_alert(&self, new: NewAlert) -> Result<Alert> {
        let alert = Alert::new(
            new.alert_type,
            new.latitude,
            new.longitude,
            new.details,
            new.impact_magnitude,
            new.reporter_id,
        )
        .map_err(|e| DispatchError::Validation(e.to_string()))?;

        self.alerts
            .create(&alert)
            .await
            .map_err(DispatchError::from_store)?;

        tracing::info!(
            alert_id = %alert.alert_id,
            alert_type = %alert.alert_type,
            lat = alert.location.latitude,
            lon = alert.location.longitude,
            "Alert created"
        );

        Ok(alert)
    }

    /// Mark a pending alert as verified (privileged caller).
    pub async fn verify(&self, alert_id: Uuid) -> Result<Alert> {
        self.step(alert_id, AlertStatus::Pending, AlertStatus::Verified)
            .await
    }

    /// Release a verified alert to the driver pool (privileged caller).
    pub async fn dispatch(&self, alert_id: Uuid) -> Result<Alert> {
        let alert = self
            .step(alert_id, AlertStatus::Verified, AlertStatus::Dispatched)
            .await?;
        tracing::info!(alert_id = %alert_id, "Alert dispatched to responders");
        Ok(alert)
    }

    /// A driver claims exclusive responsibility for a dispatched alert.
    ///
    /// Exactly one of any number of concurrent calls commits; every other
    /// caller observes [`DispatchError::AlreadyAssigned`] and no partial
    /// state. The alert-side CAS is authoritative; the driver-availability
    /// CAS is the gate evaluated immediately before it, compensated if the
    /// alert side loses the race.
    pub async fn accept_alert(&self, alert_id: Uuid, driver_id: Uuid) -> Result<Alert> {
        // Fast-path rejection; the CAS below is what actually decides races.
        let alert = self.get_alert(alert_id).await?;
        match alert.status {
            AlertStatus::Dispatched => {}
            AlertStatus::Accepted => {
                return Err(DispatchError::AlreadyAssigned { alert_id });
            }
            status => {
                return Err(DispatchError::Conflict { alert_id, status });
            }
        }

        // Driver-side gate: flips availability, or proves the driver is busy.
        let gate = self
            .drivers
            .conditional_set_availability(driver_id, true, false)
            .await
            .map_err(DispatchError::from_store)?;
        if !gate.committed() {
            return Err(DispatchError::DriverUnavailable { driver_id });
        }

        // Authoritative commit: first writer wins, no retries.
        let accepted_at = Utc::now();
        let outcome = self
            .alerts
            .conditional_transition(
                alert_id,
                AlertStatus::Dispatched,
                StatusChange::accept(driver_id, accepted_at),
            )
            .await
            .map_err(DispatchError::from_store)?;

        if outcome == CasOutcome::PredicateFailed {
            // Lost the race; hand the driver back before reporting it.
            self.restore_availability(driver_id).await;
            return Err(DispatchError::AlreadyAssigned { alert_id });
        }

        tracing::info!(
            alert_id = %alert_id,
            driver_id = %driver_id,
            "Alert accepted"
        );

        self.get_alert(alert_id).await
    }

    /// The assigned driver closes out an accepted alert.
    pub async fn resolve_alert(&self, alert_id: Uuid, driver_id: Uuid) -> Result<Alert> {
        let alert = self.get_alert(alert_id).await?;

        if alert.status != AlertStatus::Accepted || alert.assigned_driver_id != Some(driver_id) {
            return Err(DispatchError::Conflict {
                alert_id,
                status: alert.status,
            });
        }

        let outcome = self
            .alerts
            .conditional_transition(
                alert_id,
                AlertStatus::Accepted,
                StatusChange::resolve(Utc::now()),
            )
            .await
            .map_err(DispatchError::from_store)?;

        if outcome == CasOutcome::PredicateFailed {
            let current = self.get_alert(alert_id).await?;
            return Err(DispatchError::Conflict {
                alert_id,
                status: current.status,
            });
        }

        self.restore_availability(driver_id).await;

        tracing::info!(
            alert_id = %alert_id,
            driver_id = %driver_id,
            "Alert resolved by assignee"
        );

        self.get_alert(alert_id).await
    }

    /// Administrative early closure of an alert that was never accepted.
    ///
    /// Rejected for `Accepted` alerts: resolution of an active assignment
    /// belongs to the assignee, so no availability flag ever needs a forced
    /// clear here.
    pub async fn admin_resolve(&self, alert_id: Uuid) -> Result<Alert> {
        let alert = self.get_alert(alert_id).await?;

        if !matches!(
            alert.status,
            AlertStatus::Pending | AlertStatus::Verified | AlertStatus::Dispatched
        ) {
            return Err(DispatchError::Conflict {
                alert_id,
                status: alert.status,
            });
        }

        let outcome = self
            .alerts
            .conditional_transition(alert_id, alert.status, StatusChange::resolve(Utc::now()))
            .await
            .map_err(DispatchError::from_store)?;

        if outcome == CasOutcome::PredicateFailed {
            let current = self.get_alert(alert_id).await?;
            return Err(DispatchError::Conflict {
                alert_id,
                status: current.status,
            });
        }

        tracing::info!(alert_id = %alert_id, "Alert resolved administratively");

        self.get_alert(alert_id).await
    }

    // =========================================================================
    // DRIVER BOOKKEEPING
    // =========================================================================

    /// Register a new driver with the dispatcher pool.
    pub async fn register_driver(&self, external_id: Option<String>) -> Result<Driver> {
        let driver = Driver::new(external_id);
        self.drivers
            .create(&driver)
            .await
            .map_err(DispatchError::from_store)?;

        tracing::info!(driver_id = %driver.driver_id, "Driver registered");
        Ok(driver)
    }

    /// Overwrite a driver's last-known position (last write wins).
    pub async fn update_driver_location(
        &self,
        driver_id: Uuid,
        lat: f64,
        lon: f64,
    ) -> Result<Driver> {
        let location =
            Coordinates::new(lat, lon).map_err(|e| DispatchError::Validation(e.to_string()))?;

        self.drivers
            .set_location(driver_id, location)
            .await
            .map_err(DispatchError::from_store)?;

        tracing::debug!(driver_id = %driver_id, "Driver location updated");

        self.get_driver(driver_id).await
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// Shared body of the plain forward transitions (verify, dispatch).
    async fn step(&self, alert_id: Uuid, from: AlertStatus, to: AlertStatus) -> Result<Alert> {
        let alert = self.get_alert(alert_id).await?;
        if alert.status != from {
            return Err(DispatchError::Conflict {
                alert_id,
                status: alert.status,
            });
        }

        let outcome = self
            .alerts
            .conditional_transition(alert_id, from, StatusChange::to_status(to))
            .await
            .map_err(DispatchError::from_store)?;

        if outcome == CasOutcome::PredicateFailed {
            let current = self.get_alert(alert_id).await?;
            return Err(DispatchError::Conflict {
                alert_id,
                status: current.status,
            });
        }

        self.get_alert(alert_id).await
    }

    /// Hand a driver back to the pool. Failure here is logged rather than
    /// propagated: the alert-side state is already committed and a stuck
    /// availability flag shows up in driver queries, not in alert state.
    async fn restore_availability(&self, driver_id: Uuid) {
        match self
            .drivers
            .conditional_set_availability(driver_id, false, true)
            .await
        {
            Ok(CasOutcome::Committed) => {}
            Ok(CasOutcome::PredicateFailed) => {
                tracing::warn!(
                    driver_id = %driver_id,
                    "Driver was already available when restoring"
                );
            }
            Err(e) => {
                tracing::error!(
                    driver_id = %driver_id,
                    error = %e,
                    "Failed to restore driver availability"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rescue_persistence::{InMemoryAlertRepository, InMemoryDriverRepository};
    use tokio::sync::Barrier;

    fn engine() -> DispatchEngine {
        DispatchEngine::new(
            Arc::new(InMemoryAlertRepository::new()),
            Arc::new(InMemoryDriverRepository::new()),
        )
    }

    fn accident() -> NewAlert {
        NewAlert {
            alert_type: AlertType::Accident,
            latitude: 40.7128,
            longitude: -74.0060,
            details: Some("collision on FDR Drive".to_string()),
            impact_magnitude: Some(30.5),
            reporter_id: Some(Uuid::new_v4()),
        }
    }

    async fn dispatched_alert(engine: &DispatchEngine) -> Alert {
        let alert = engine.create_alert(accident()).await.unwrap();
        engine.verify(alert.alert_id).await.unwrap();
        engine.dispatch(alert.alert_id).await.unwrap()
    }

    #[tokio::test]
    async fn test_full_lifecycle_scenario() {
        let engine = engine();
        let d1 = engine.register_driver(Some("AMB001".to_string())).await.unwrap();
        let d2 = engine.register_driver(Some("AMB002".to_string())).await.unwrap();

        let alert = engine.create_alert(accident()).await.unwrap();
        assert_eq!(alert.status, AlertStatus::Pending);
        assert_eq!(alert.impact_magnitude, Some(30.5));

        let alert = engine.verify(alert.alert_id).await.unwrap();
        assert_eq!(alert.status, AlertStatus::Verified);

        let alert = engine.dispatch(alert.alert_id).await.unwrap();
        assert_eq!(alert.status, AlertStatus::Dispatched);
        assert_eq!(engine.list_dispatchable().await.unwrap().len(), 1);

        // D1 wins the assignment
        let alert = engine.accept_alert(alert.alert_id, d1.driver_id).await.unwrap();
        assert_eq!(alert.status, AlertStatus::Accepted);
        assert_eq!(alert.assigned_driver_id, Some(d1.driver_id));
        assert!(alert.accepted_at.is_some());
        assert!(!engine.get_driver(d1.driver_id).await.unwrap().is_available);

        // D2 arrives late
        let late = engine.accept_alert(alert.alert_id, d2.driver_id).await;
        assert!(matches!(late, Err(DispatchError::AlreadyAssigned { .. })));
        assert!(engine.get_driver(d2.driver_id).await.unwrap().is_available);

        // D1 resolves, D2 cannot
        let alert = engine.resolve_alert(alert.alert_id, d1.driver_id).await.unwrap();
        assert_eq!(alert.status, AlertStatus::Resolved);
        assert!(alert.resolved);
        assert!(alert.resolved_at.is_some());
        assert!(alert.assignment_invariant_holds());
        assert!(engine.get_driver(d1.driver_id).await.unwrap().is_available);

        let denied = engine.resolve_alert(alert.alert_id, d2.driver_id).await;
        assert!(matches!(denied, Err(DispatchError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_accept_race_has_exactly_one_winner() {
        const RACERS: usize = 8;

        let engine = engine();
        let alert = dispatched_alert(&engine).await;

        let mut driver_ids = Vec::new();
        for i in 0..RACERS {
            let driver = engine
                .register_driver(Some(format!("AMB{:03}", i + 1)))
                .await
                .unwrap();
            driver_ids.push(driver.driver_id);
        }

        let barrier = Arc::new(Barrier::new(RACERS));
        let mut handles = Vec::new();
        for driver_id in driver_ids.clone() {
            let engine = engine.clone();
            let barrier = Arc::clone(&barrier);
            let alert_id = alert.alert_id;
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                (driver_id, engine.accept_alert(alert_id, driver_id).await)
            }));
        }

        let mut winners = Vec::new();
        let mut already_assigned = 0;
        for handle in handles {
            let (driver_id, result) = handle.await.unwrap();
            match result {
                Ok(alert) => winners.push((driver_id, alert)),
                Err(DispatchError::AlreadyAssigned { .. }) => already_assigned += 1,
                Err(other) => panic!("unexpected failure: {other}"),
            }
        }

        assert_eq!(winners.len(), 1);
        assert_eq!(already_assigned, RACERS - 1);

        let (winner_id, accepted) = &winners[0];
        assert_eq!(accepted.assigned_driver_id, Some(*winner_id));

        let stored = engine.get_alert(alert.alert_id).await.unwrap();
        assert_eq!(stored.status, AlertStatus::Accepted);
        assert_eq!(stored.assigned_driver_id, Some(*winner_id));

        // Losers were compensated back into the pool; the winner was not.
        for driver_id in driver_ids {
            let available = engine.get_driver(driver_id).await.unwrap().is_available;
            assert_eq!(available, driver_id != *winner_id);
        }
    }

    #[tokio::test]
    async fn test_repeat_accept_by_winner_changes_nothing() {
        let engine = engine();
        let alert = dispatched_alert(&engine).await;
        let driver = engine.register_driver(None).await.unwrap();

        let first = engine.accept_alert(alert.alert_id, driver.driver_id).await.unwrap();

        let second = engine.accept_alert(alert.alert_id, driver.driver_id).await;
        assert!(matches!(second, Err(DispatchError::AlreadyAssigned { .. })));

        let stored = engine.get_alert(alert.alert_id).await.unwrap();
        assert_eq!(stored.accepted_at, first.accepted_at);
        assert_eq!(stored.assigned_driver_id, Some(driver.driver_id));
        // The winner keeps its assignment; availability is untouched
        assert!(!engine.get_driver(driver.driver_id).await.unwrap().is_available);
    }

    #[tokio::test]
    async fn test_accept_requires_dispatched_state() {
        let engine = engine();
        let driver = engine.register_driver(None).await.unwrap();

        let pending = engine.create_alert(accident()).await.unwrap();
        let result = engine.accept_alert(pending.alert_id, driver.driver_id).await;
        assert!(matches!(
            result,
            Err(DispatchError::Conflict {
                status: AlertStatus::Pending,
                ..
            })
        ));

        // The driver-side gate never ran
        assert!(engine.get_driver(driver.driver_id).await.unwrap().is_available);
    }

    #[tokio::test]
    async fn test_busy_driver_cannot_accept_second_alert() {
        let engine = engine();
        let driver = engine.register_driver(None).await.unwrap();

        let first = dispatched_alert(&engine).await;
        let second = dispatched_alert(&engine).await;

        engine.accept_alert(first.alert_id, driver.driver_id).await.unwrap();

        let result = engine.accept_alert(second.alert_id, driver.driver_id).await;
        assert!(matches!(result, Err(DispatchError::DriverUnavailable { .. })));

        // The second alert is still up for grabs
        let stored = engine.get_alert(second.alert_id).await.unwrap();
        assert_eq!(stored.status, AlertStatus::Dispatched);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let engine = engine();
        let alert = dispatched_alert(&engine).await;

        let result = engine.accept_alert(Uuid::new_v4(), Uuid::new_v4()).await;
        assert!(matches!(result, Err(DispatchError::NotFound { .. })));

        let result = engine.accept_alert(alert.alert_id, Uuid::new_v4()).await;
        assert!(matches!(result, Err(DispatchError::NotFound { .. })));

        let result = engine.update_driver_location(Uuid::new_v4(), 40.0, -74.0).await;
        assert!(matches!(result, Err(DispatchError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_verify_and_dispatch_enforce_source_state() {
        let engine = engine();
        let alert = engine.create_alert(accident()).await.unwrap();

        // Cannot dispatch before verification
        let result = engine.dispatch(alert.alert_id).await;
        assert!(matches!(
            result,
            Err(DispatchError::Conflict {
                status: AlertStatus::Pending,
                ..
            })
        ));

        engine.verify(alert.alert_id).await.unwrap();

        // Double verify is a conflict
        let result = engine.verify(alert.alert_id).await;
        assert!(matches!(result, Err(DispatchError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_admin_resolve_pre_accept_states() {
        let engine = engine();

        // From Pending
        let a = engine.create_alert(accident()).await.unwrap();
        let resolved = engine.admin_resolve(a.alert_id).await.unwrap();
        assert_eq!(resolved.status, AlertStatus::Resolved);
        assert!(resolved.resolved_at.is_some());
        assert!(resolved.assigned_driver_id.is_none());
        assert!(resolved.assignment_invariant_holds());

        // From Verified
        let b = engine.create_alert(accident()).await.unwrap();
        engine.verify(b.alert_id).await.unwrap();
        assert!(engine.admin_resolve(b.alert_id).await.is_ok());

        // From Dispatched
        let c = dispatched_alert(&engine).await;
        assert!(engine.admin_resolve(c.alert_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_admin_resolve_rejected_for_accepted_and_resolved() {
        let engine = engine();
        let driver = engine.register_driver(None).await.unwrap();
        let alert = dispatched_alert(&engine).await;
        engine.accept_alert(alert.alert_id, driver.driver_id).await.unwrap();

        let result = engine.admin_resolve(alert.alert_id).await;
        assert!(matches!(
            result,
            Err(DispatchError::Conflict {
                status: AlertStatus::Accepted,
                ..
            })
        ));

        engine.resolve_alert(alert.alert_id, driver.driver_id).await.unwrap();
        let result = engine.admin_resolve(alert.alert_id).await;
        assert!(matches!(result, Err(DispatchError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_out_of_range_latitude_persists_nothing() {
        let engine = engine();
        let mut bad = accident();
        bad.latitude = 91.0;

        let result = engine.create_alert(bad).await;
        assert!(matches!(result, Err(DispatchError::Validation(_))));

        let visible = engine.list_visible_to(None, true).await.unwrap();
        assert!(visible.is_empty());
    }

    #[tokio::test]
    async fn test_update_driver_location_overwrites() {
        let engine = engine();
        let driver = engine.register_driver(None).await.unwrap();
        assert!(driver.location.is_none());

        let updated = engine
            .update_driver_location(driver.driver_id, 40.7128, -74.0060)
            .await
            .unwrap();
        assert_eq!(updated.location.unwrap().latitude, 40.7128);

        // Last write wins
        let updated = engine
            .update_driver_location(driver.driver_id, 40.7306, -73.9352)
            .await
            .unwrap();
        assert_eq!(updated.location.unwrap().longitude, -73.9352);

        let result = engine.update_driver_location(driver.driver_id, 0.0, 181.0).await;
        assert!(matches!(result, Err(DispatchError::Validation(_))));
    }
}
