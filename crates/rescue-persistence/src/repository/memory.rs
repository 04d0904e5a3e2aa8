//! In-memory repository implementation.
//!
//! Backs the engine test suite and local development. Each map is guarded
//! by a single mutex; the conditional-update predicate check and mutation
//! happen under one lock guard with no await point in between, which makes
//! the CAS indivisible exactly as the Scylla LWT backend guarantees.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

use crate::error::{PersistenceError, Result};
use crate::repository::traits::{
    AlertRepository, CasOutcome, DriverRepository, StatusChange,
};
use rescue_domain::{Alert, AlertStatus, Coordinates, Driver};

// =============================================================================
// ALERT REPOSITORY
// =============================================================================

/// Mutex-guarded alert store.
#[derive(Default)]
pub struct InMemoryAlertRepository {
    alerts: Mutex<HashMap<Uuid, Alert>>,
}

impl InMemoryAlertRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Alert>> {
        self.alerts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl AlertRepository for InMemoryAlertRepository {
    async fn get(&self, alert_id: Uuid) -> Result<Option<Alert>> {
        Ok(self.lock().get(&alert_id).cloned())
    }

    async fn create(&self, alert: &Alert) -> Result<()> {
        self.lock().insert(alert.alert_id, alert.clone());
        Ok(())
    }

    async fn conditional_transition(
        &self,
        alert_id: Uuid,
        expected: AlertStatus,
        change: StatusChange,
    ) -> Result<CasOutcome> {
        let mut alerts = self.lock();
        let alert = alerts
            .get_mut(&alert_id)
            .ok_or_else(|| PersistenceError::not_found("Alert", alert_id))?;

        if alert.status != expected {
            return Ok(CasOutcome::PredicateFailed);
        }
        change.apply_to(alert);
        Ok(CasOutcome::Committed)
    }

    async fn list_by_status(&self, status: AlertStatus) -> Result<Vec<Alert>> {
        Ok(self
            .lock()
            .values()
            .filter(|a| a.status == status)
            .cloned()
            .collect())
    }

    async fn list_assigned_to(&self, driver_id: Uuid) -> Result<Vec<Alert>> {
        Ok(self
            .lock()
            .values()
            .filter(|a| a.assigned_driver_id == Some(driver_id))
            .cloned()
            .collect())
    }

    async fn list_by_reporter(&self, reporter_id: Uuid) -> Result<Vec<Alert>> {
        Ok(self
            .lock()
            .values()
            .filter(|a| a.reporter_id == Some(reporter_id))
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Alert>> {
        Ok(self.lock().values().cloned().collect())
    }
}

// =============================================================================
// DRIVER REPOSITORY
// =============================================================================

/// Mutex-guarded driver store.
#[derive(Default)]
pub struct InMemoryDriverRepository {
    drivers: Mutex<HashMap<Uuid, Driver>>,
}

impl InMemoryDriverRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Driver>> {
        self.drivers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DriverRepository for InMemoryDriverRepository {
    async fn get(&self, driver_id: Uuid) -> Result<Option<Driver>> {
        Ok(self.lock().get(&driver_id).cloned())
    }

    async fn create(&self, driver: &Driver) -> Result<()> {
        self.lock().insert(driver.driver_id, driver.clone());
        Ok(())
    }

    async fn conditional_set_availability(
        &self,
        driver_id: Uuid,
        expected: bool,
        new: bool,
    ) -> Result<CasOutcome> {
        let mut drivers = self.lock();
        let driver = drivers
            .get_mut(&driver_id)
            .ok_or_else(|| PersistenceError::not_found("Driver", driver_id))?;

        if driver.is_available != expected {
            return Ok(CasOutcome::PredicateFailed);
        }
        driver.is_available = new;
        Ok(CasOutcome::Committed)
    }

    async fn set_location(&self, driver_id: Uuid, location: Coordinates) -> Result<()> {
        let mut drivers = self.lock();
        let driver = drivers
            .get_mut(&driver_id)
            .ok_or_else(|| PersistenceError::not_found("Driver", driver_id))?;
        driver.location = Some(location);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rescue_domain::AlertType;
    use std::sync::Arc;

    fn dispatched_alert() -> Alert {
        let mut alert =
            Alert::new(AlertType::Accident, 40.7128, -74.0060, None, Some(30.5), None).unwrap();
        alert.status = AlertStatus::Dispatched;
        alert
    }

    #[tokio::test]
    async fn test_conditional_transition_commits_on_match() {
        let repo = InMemoryAlertRepository::new();
        let alert = dispatched_alert();
        let driver_id = Uuid::new_v4();
        repo.create(&alert).await.unwrap();

        let outcome = repo
            .conditional_transition(
                alert.alert_id,
                AlertStatus::Dispatched,
                StatusChange::accept(driver_id, Utc::now()),
            )
            .await
            .unwrap();

        assert_eq!(outcome, CasOutcome::Committed);
        let stored = repo.get(alert.alert_id).await.unwrap().unwrap();
        assert_eq!(stored.status, AlertStatus::Accepted);
        assert_eq!(stored.assigned_driver_id, Some(driver_id));
        assert!(stored.accepted_at.is_some());
    }

    #[tokio::test]
    async fn test_predicate_failure_leaves_record_untouched() {
        let repo = InMemoryAlertRepository::new();
        let alert = dispatched_alert();
        repo.create(&alert).await.unwrap();

        let outcome = repo
            .conditional_transition(
                alert.alert_id,
                AlertStatus::Pending,
                StatusChange::to_status(AlertStatus::Verified),
            )
            .await
            .unwrap();

        assert_eq!(outcome, CasOutcome::PredicateFailed);
        let stored = repo.get(alert.alert_id).await.unwrap().unwrap();
        assert_eq!(stored, alert);
    }

    #[tokio::test]
    async fn test_conditional_transition_unknown_alert_is_not_found() {
        let repo = InMemoryAlertRepository::new();
        let result = repo
            .conditional_transition(
                Uuid::new_v4(),
                AlertStatus::Pending,
                StatusChange::to_status(AlertStatus::Verified),
            )
            .await;
        assert!(matches!(result, Err(PersistenceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_cas_has_single_winner() {
        let repo = Arc::new(InMemoryAlertRepository::new());
        let alert = dispatched_alert();
        repo.create(&alert).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let repo = Arc::clone(&repo);
            let alert_id = alert.alert_id;
            let driver_id = Uuid::new_v4();
            handles.push(tokio::spawn(async move {
                repo.conditional_transition(
                    alert_id,
                    AlertStatus::Dispatched,
                    StatusChange::accept(driver_id, Utc::now()),
                )
                .await
                .unwrap()
            }));
        }

        let mut committed = 0;
        for handle in handles {
            if handle.await.unwrap().committed() {
                committed += 1;
            }
        }
        assert_eq!(committed, 1);
    }

    #[tokio::test]
    async fn test_resolve_change_retains_assignment_fields() {
        let repo = InMemoryAlertRepository::new();
        let alert = dispatched_alert();
        let driver_id = Uuid::new_v4();
        repo.create(&alert).await.unwrap();

        repo.conditional_transition(
            alert.alert_id,
            AlertStatus::Dispatched,
            StatusChange::accept(driver_id, Utc::now()),
        )
        .await
        .unwrap();
        repo.conditional_transition(
            alert.alert_id,
            AlertStatus::Accepted,
            StatusChange::resolve(Utc::now()),
        )
        .await
        .unwrap();

        let stored = repo.get(alert.alert_id).await.unwrap().unwrap();
        assert_eq!(stored.status, AlertStatus::Resolved);
        assert!(stored.resolved);
        assert_eq!(stored.assigned_driver_id, Some(driver_id));
        assert!(stored.accepted_at.is_some());
        assert!(stored.resolved_at.is_some());
        assert!(stored.assignment_invariant_holds());
    }

    #[tokio::test]
    async fn test_driver_availability_cas() {
        let repo = InMemoryDriverRepository::new();
        let driver = Driver::new(Some("AMB001".to_string()));
        repo.create(&driver).await.unwrap();

        let flipped = repo
            .conditional_set_availability(driver.driver_id, true, false)
            .await
            .unwrap();
        assert_eq!(flipped, CasOutcome::Committed);

        // Second flip with a stale expectation fails and changes nothing
        let stale = repo
            .conditional_set_availability(driver.driver_id, true, false)
            .await
            .unwrap();
        assert_eq!(stale, CasOutcome::PredicateFailed);
        assert!(!repo.get(driver.driver_id).await.unwrap().unwrap().is_available);
    }

    #[tokio::test]
    async fn test_set_location_requires_known_driver() {
        let repo = InMemoryDriverRepository::new();
        let location = Coordinates::new(40.7, -74.0).unwrap();
        let result = repo.set_location(Uuid::new_v4(), location).await;
        assert!(matches!(result, Err(PersistenceError::NotFound { .. })));

        let driver = Driver::new(None);
        repo.create(&driver).await.unwrap();
        repo.set_location(driver.driver_id, location).await.unwrap();
        let stored = repo.get(driver.driver_id).await.unwrap().unwrap();
        assert_eq!(stored.location, Some(location));
    }
}
