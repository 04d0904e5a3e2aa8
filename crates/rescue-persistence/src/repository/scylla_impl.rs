//! ScyllaDB repository implementation.
//!
//! Conditional updates are expressed as lightweight transactions
//! (`UPDATE ... IF <predicate>`); the `[applied]` column of the LWT result
//! decides between `Committed` and `PredicateFailed`.

// The legacy row-deserialization accessors (`into_legacy_result`) are
// deprecated in scylla 0.15 but remain the 1:1 path to the `Row`/`columns`
// shape this module decodes.
#![allow(deprecated)]

use scylla::{Session, SessionBuilder};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{PersistenceError, Result};
use crate::repository::traits::{
    AlertRepository, CasOutcome, DriverRepository, StatusChange,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rescue_domain::{Alert, AlertStatus, AlertType, Coordinates, Driver};

// =============================================================================
// SCYLLA CONFIGURATION
// =============================================================================

/// ScyllaDB connection configuration.
#[derive(Debug, Clone)]
pub struct ScyllaConfig {
    pub hosts: Vec<String>,
    pub keyspace: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ScyllaConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["localhost:9042".to_string()],
            keyspace: "rescue_ops".to_string(),
            username: None,
            password: None,
        }
    }
}

// =============================================================================
// SCYLLA CLIENT
// =============================================================================

/// ScyllaDB client wrapper.
pub struct ScyllaClient {
    session: Arc<Session>,
    pub config: ScyllaConfig,
}

impl ScyllaClient {
    /// Create a new ScyllaDB client.
    pub async fn new(config: ScyllaConfig) -> Result<Self> {
        let mut builder = SessionBuilder::new().known_nodes(&config.hosts);

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.user(user, pass);
        }

        let session = builder.build().await?;

        // Use keyspace
        session
            .query_unpaged(format!("USE {}", config.keyspace), ())
            .await?;

        Ok(Self {
            session: Arc::new(session),
            config,
        })
    }

    /// Get session reference.
    pub fn session(&self) -> &Session {
        &self.session
    }
}

// =============================================================================
// ROW MAPPING
// =============================================================================

const ALERT_COLUMNS: &str = "alert_id, alert_type, latitude, longitude, reported_at, \
     details, impact_magnitude, reporter_id, status, resolved, \
     assigned_driver_id, accepted_at, resolved_at";

fn millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

/// Decode an alert row in SELECT column order; None on a malformed row.
fn alert_from_row(row: scylla::frame::response::result::Row) -> Option<Alert> {
    let cols = row.columns;
    if cols.len() < 13 {
        return None;
    }

    let alert_id = cols[0].as_ref().and_then(|v| v.as_uuid())?;
    let alert_type: AlertType = cols[1]
        .as_ref()
        .and_then(|v| v.as_text())
        .map(|s| s.to_string())?
        .parse()
        .ok()?;
    let latitude = cols[2].as_ref().and_then(|v| v.as_double())?;
    let longitude = cols[3].as_ref().and_then(|v| v.as_double())?;
    let reported_at = cols[4]
        .as_ref()
        .and_then(|v| v.as_bigint())
        .and_then(from_millis)?;
    let details = cols[5].as_ref().and_then(|v| v.as_text()).map(|s| s.to_string());
    let impact_magnitude = cols[6].as_ref().and_then(|v| v.as_double());
    let reporter_id = cols[7].as_ref().and_then(|v| v.as_uuid());
    let status: AlertStatus = cols[8]
        .as_ref()
        .and_then(|v| v.as_text())
        .map(|s| s.to_string())?
        .parse()
        .ok()?;
    let resolved = cols[9].as_ref().and_then(|v| v.as_boolean()).unwrap_or(false);
    let assigned_driver_id = cols[10].as_ref().and_then(|v| v.as_uuid());
    let accepted_at = cols[11]
        .as_ref()
        .and_then(|v| v.as_bigint())
        .and_then(from_millis);
    let resolved_at = cols[12]
        .as_ref()
        .and_then(|v| v.as_bigint())
        .and_then(from_millis);

    Some(Alert {
        alert_id,
        alert_type,
        location: Coordinates::new(latitude, longitude).ok()?,
        reported_at,
        details,
        impact_magnitude,
        reporter_id,
        status,
        resolved,
        assigned_driver_id,
        accepted_at,
        resolved_at,
    })
}

/// Decode a driver row; None on a malformed row.
fn driver_from_row(row: scylla::frame::response::result::Row) -> Option<Driver> {
    let cols = row.columns;
    if cols.len() < 6 {
        return None;
    }

    let driver_id = cols[0].as_ref().and_then(|v| v.as_uuid())?;
    let external_id = cols[1].as_ref().and_then(|v| v.as_text()).map(|s| s.to_string());
    let latitude = cols[2].as_ref().and_then(|v| v.as_double());
    let longitude = cols[3].as_ref().and_then(|v| v.as_double());
    let is_available = cols[4].as_ref().and_then(|v| v.as_boolean())?;
    let registered_at = cols[5]
        .as_ref()
        .and_then(|v| v.as_bigint())
        .and_then(from_millis)?;

    let location = match (latitude, longitude) {
        (Some(lat), Some(lon)) => Coordinates::new(lat, lon).ok(),
        _ => None,
    };

    Some(Driver {
        driver_id,
        external_id,
        location,
        is_available,
        registered_at,
    })
}

/// Read the `[applied]` column of an LWT result.
#[allow(deprecated)]
fn lwt_applied(result: scylla::QueryResult) -> bool {
    result
        .into_legacy_result()
        .ok()
        .and_then(|r| r.rows)
        .and_then(|rows| rows.into_iter().next())
        .and_then(|row| row.columns.into_iter().next())
        .flatten()
        .and_then(|v| v.as_boolean())
        .unwrap_or(false)
}

// =============================================================================
// ALERT REPOSITORY
// =============================================================================

/// Alert repository backed by the `alerts` table.
pub struct ScyllaAlertRepository {
    client: Arc<ScyllaClient>,
}

impl ScyllaAlertRepository {
    /// Create a new alert repository.
    pub fn new(client: Arc<ScyllaClient>) -> Self {
        Self { client }
    }

    async fn select_where(&self, clause: &str, value: impl scylla::serialize::value::SerializeValue) -> Result<Vec<Alert>> {
        let query = format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE {clause} = ? ALLOW FILTERING"
        );
        let result = self
            .client
            .session
            .query_unpaged(query, (value,))
            .await?;

        Ok(result
            .into_legacy_result()
            .ok()
            .and_then(|r| r.rows)
            .unwrap_or_default()
            .into_iter()
            .filter_map(alert_from_row)
            .collect())
    }
}

#[async_trait]
impl AlertRepository for ScyllaAlertRepository {
    async fn get(&self, alert_id: Uuid) -> Result<Option<Alert>> {
        let query = format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE alert_id = ?");
        let result = self
            .client
            .session
            .query_unpaged(query, (alert_id,))
            .await?;

        Ok(result
            .into_legacy_result()
            .ok()
            .and_then(|r| r.rows)
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(alert_from_row))
    }

    async fn create(&self, alert: &Alert) -> Result<()> {
        let query = format!(
            "INSERT INTO alerts ({ALERT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );

        self.client
            .session
            .query_unpaged(
                query,
                (
                    alert.alert_id,
                    alert.alert_type.as_str(),
                    alert.location.latitude,
                    alert.location.longitude,
                    millis(alert.reported_at),
                    alert.details.clone(),
                    alert.impact_magnitude,
                    alert.reporter_id,
                    alert.status.as_str(),
                    alert.resolved,
                    alert.assigned_driver_id,
                    alert.accepted_at.map(millis),
                    alert.resolved_at.map(millis),
                ),
            )
            .await?;

        Ok(())
    }

    async fn conditional_transition(
        &self,
        alert_id: Uuid,
        expected: AlertStatus,
        change: StatusChange,
    ) -> Result<CasOutcome> {
        // Alerts are never deleted, so the existence check cannot go stale:
        // a failed LWT afterwards always means a lost predicate race.
        if self.get(alert_id).await?.is_none() {
            return Err(PersistenceError::not_found("Alert", alert_id));
        }

        let resolved = change.to == AlertStatus::Resolved;
        let result = if let (Some(driver_id), Some(accepted_at)) =
            (change.assigned_driver_id, change.accepted_at)
        {
            self.client
                .session
                .query_unpaged(
                    "UPDATE alerts SET status = ?, resolved = ?, \
                     assigned_driver_id = ?, accepted_at = ? \
                     WHERE alert_id = ? IF status = ?",
                    (
                        change.to.as_str(),
                        resolved,
                        driver_id,
                        millis(accepted_at),
                        alert_id,
                        expected.as_str(),
                    ),
                )
                .await?
        } else if let Some(resolved_at) = change.resolved_at {
            self.client
                .session
                .query_unpaged(
                    "UPDATE alerts SET status = ?, resolved = ?, resolved_at = ? \
                     WHERE alert_id = ? IF status = ?",
                    (
                        change.to.as_str(),
                        resolved,
                        millis(resolved_at),
                        alert_id,
                        expected.as_str(),
                    ),
                )
                .await?
        } else {
            self.client
                .session
                .query_unpaged(
                    "UPDATE alerts SET status = ?, resolved = ? \
                     WHERE alert_id = ? IF status = ?",
                    (change.to.as_str(), resolved, alert_id, expected.as_str()),
                )
                .await?
        };

        if lwt_applied(result) {
            Ok(CasOutcome::Committed)
        } else {
            Ok(CasOutcome::PredicateFailed)
        }
    }

    async fn list_by_status(&self, status: AlertStatus) -> Result<Vec<Alert>> {
        self.select_where("status", status.as_str()).await
    }

    async fn list_assigned_to(&self, driver_id: Uuid) -> Result<Vec<Alert>> {
        self.select_where("assigned_driver_id", driver_id).await
    }

    async fn list_by_reporter(&self, reporter_id: Uuid) -> Result<Vec<Alert>> {
        self.select_where("reporter_id", reporter_id).await
    }

    async fn list_all(&self) -> Result<Vec<Alert>> {
        let query = format!("SELECT {ALERT_COLUMNS} FROM alerts");
        let result = self.client.session.query_unpaged(query, ()).await?;

        Ok(result
            .into_legacy_result()
            .ok()
            .and_then(|r| r.rows)
            .unwrap_or_default()
            .into_iter()
            .filter_map(alert_from_row)
            .collect())
    }
}

// =============================================================================
// DRIVER REPOSITORY
// =============================================================================

const DRIVER_COLUMNS: &str =
    "driver_id, external_id, latitude, longitude, is_available, registered_at";

/// Driver repository backed by the `drivers` table.
pub struct ScyllaDriverRepository {
    client: Arc<ScyllaClient>,
}

impl ScyllaDriverRepository {
    /// Create a new driver repository.
    pub fn new(client: Arc<ScyllaClient>) -> Self {
        Self { client }
    }

    async fn exists(&self, driver_id: Uuid) -> Result<bool> {
        Ok(self.get(driver_id).await?.is_some())
    }
}

#[async_trait]
impl DriverRepository for ScyllaDriverRepository {
    async fn get(&self, driver_id: Uuid) -> Result<Option<Driver>> {
        let query = format!("SELECT {DRIVER_COLUMNS} FROM drivers WHERE driver_id = ?");
        let result = self
            .client
            .session
            .query_unpaged(query, (driver_id,))
            .await?;

        Ok(result
            .into_legacy_result()
            .ok()
            .and_then(|r| r.rows)
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(driver_from_row))
    }

    async fn create(&self, driver: &Driver) -> Result<()> {
        let query = format!(
            "INSERT INTO drivers ({DRIVER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"
        );

        self.client
            .session
            .query_unpaged(
                query,
                (
                    driver.driver_id,
                    driver.external_id.clone(),
                    driver.location.map(|l| l.latitude),
                    driver.location.map(|l| l.longitude),
                    driver.is_available,
                    millis(driver.registered_at),
                ),
            )
            .await?;

        Ok(())
    }

    async fn conditional_set_availability(
        &self,
        driver_id: Uuid,
        expected: bool,
        new: bool,
    ) -> Result<CasOutcome> {
        // Driver rows are never deleted; see the alert-side note.
        if !self.exists(driver_id).await? {
            return Err(PersistenceError::not_found("Driver", driver_id));
        }

        let result = self
            .client
            .session
            .query_unpaged(
                "UPDATE drivers SET is_available = ? WHERE driver_id = ? IF is_available = ?",
                (new, driver_id, expected),
            )
            .await?;

        if lwt_applied(result) {
            Ok(CasOutcome::Committed)
        } else {
            Ok(CasOutcome::PredicateFailed)
        }
    }

    async fn set_location(&self, driver_id: Uuid, location: Coordinates) -> Result<()> {
        // CQL UPDATE would upsert a ghost row for an unknown driver
        if !self.exists(driver_id).await? {
            return Err(PersistenceError::not_found("Driver", driver_id));
        }

        self.client
            .session
            .query_unpaged(
                "UPDATE drivers SET latitude = ?, longitude = ? WHERE driver_id = ?",
                (location.latitude, location.longitude, driver_id),
            )
            .await?;

        Ok(())
    }
}
