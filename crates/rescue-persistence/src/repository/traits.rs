//! # Repository Traits
//!
//! Abstract repository interfaces for domain entities.
//! Implementations can be swapped for different backends (ScyllaDB,
//! in-memory, etc.)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use rescue_domain::{Alert, AlertStatus, Coordinates, Driver};

// =============================================================================
// CONDITIONAL UPDATE PRIMITIVES
// =============================================================================

/// Outcome of a compare-and-swap style conditional update.
///
/// The predicate check and the mutation are observed by the store as a
/// single indivisible operation; a rejected predicate leaves the record
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// Predicate held at commit time; the mutation was applied.
    Committed,
    /// The record no longer matched the expected prior state.
    PredicateFailed,
}

impl CasOutcome {
    #[must_use]
    pub fn committed(self) -> bool {
        matches!(self, Self::Committed)
    }
}

/// The mutation half of an alert status CAS.
///
/// Fields left as `None` are not written, so assignment bookkeeping from
/// earlier transitions is retained (e.g. `accepted_at` survives resolve).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusChange {
    pub to: AlertStatus,
    pub assigned_driver_id: Option<Uuid>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl StatusChange {
    /// Plain forward transition with no bookkeeping side effects.
    #[must_use]
    pub fn to_status(to: AlertStatus) -> Self {
        Self {
            to,
            assigned_driver_id: None,
            accepted_at: None,
            resolved_at: None,
        }
    }

    /// Transition to `Accepted`, recording the winning driver.
    #[must_use]
    pub fn accept(driver_id: Uuid, at: DateTime<Utc>) -> Self {
        Self {
            to: AlertStatus::Accepted,
            assigned_driver_id: Some(driver_id),
            accepted_at: Some(at),
            resolved_at: None,
        }
    }

    /// Transition to `Resolved`, stamping the resolution time.
    #[must_use]
    pub fn resolve(at: DateTime<Utc>) -> Self {
        Self {
            to: AlertStatus::Resolved,
            assigned_driver_id: None,
            accepted_at: None,
            resolved_at: Some(at),
        }
    }

    /// Apply this change to an alert record in place.
    ///
    /// The in-memory backend applies it directly; the CQL backend mirrors
    /// the same write rules in its UPDATE statements.
    pub fn apply_to(&self, alert: &mut Alert) {
        alert.status = self.to;
        alert.resolved = self.to == AlertStatus::Resolved;
        if let Some(driver_id) = self.assigned_driver_id {
            alert.assigned_driver_id = Some(driver_id);
        }
        if let Some(at) = self.accepted_at {
            alert.accepted_at = Some(at);
        }
        if let Some(at) = self.resolved_at {
            alert.resolved_at = Some(at);
        }
    }
}

// =============================================================================
// ALERT REPOSITORY
// =============================================================================

/// Repository for Alert entity operations
///
/// Listing methods carry no ordering guarantee; callers sort.
#[async_trait]
pub trait AlertRepository: Send + Sync {
    /// Get alert by ID
    async fn get(&self, alert_id: Uuid) -> Result<Option<Alert>>;

    /// Insert a new alert (new records only, never an overwrite)
    async fn create(&self, alert: &Alert) -> Result<()>;

    /// Atomically apply `change` iff the stored status still equals
    /// `expected` at commit time.
    ///
    /// Returns [`CasOutcome::PredicateFailed`] when another writer advanced
    /// the alert first; errors with `NotFound` for an unknown id.
    async fn conditional_transition(
        &self,
        alert_id: Uuid,
        expected: AlertStatus,
        change: StatusChange,
    ) -> Result<CasOutcome>;

    /// All alerts currently in the given status
    async fn list_by_status(&self, status: AlertStatus) -> Result<Vec<Alert>>;

    /// All alerts ever assigned to the given driver, regardless of status
    async fn list_assigned_to(&self, driver_id: Uuid) -> Result<Vec<Alert>>;

    /// All alerts reported by the given user
    async fn list_by_reporter(&self, reporter_id: Uuid) -> Result<Vec<Alert>>;

    /// Every alert in the store
    async fn list_all(&self) -> Result<Vec<Alert>>;
}

// =============================================================================
// DRIVER REPOSITORY
// =============================================================================

/// Repository for Driver entity operations
#[async_trait]
pub trait DriverRepository: Send + Sync {
    /// Get driver by ID
    async fn get(&self, driver_id: Uuid) -> Result<Option<Driver>>;

    /// Insert a new driver record
    async fn create(&self, driver: &Driver) -> Result<()>;

    /// Atomically flip `is_available` iff it still reads `expected`.
    ///
    /// Errors with `NotFound` for an unknown driver.
    async fn conditional_set_availability(
        &self,
        driver_id: Uuid,
        expected: bool,
        new: bool,
    ) -> Result<CasOutcome>;

    /// Overwrite the driver's last-known coordinates (last write wins).
    ///
    /// Errors with `NotFound` for an unknown driver.
    async fn set_location(&self, driver_id: Uuid, location: Coordinates) -> Result<()>;
}
