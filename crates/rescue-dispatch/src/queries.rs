//! Read-side listing operations of the dispatch engine.

use uuid::Uuid;

use crate::engine::DispatchEngine;
use crate::error::{DispatchError, Result};
use rescue_domain::{Alert, AlertStatus};

impl DispatchEngine {
    /// All alerts open for acceptance, oldest pending response first.
    pub async fn list_dispatchable(&self) -> Result<Vec<Alert>> {
        let mut alerts = self
            .alert_repo()
            .list_by_status(AlertStatus::Dispatched)
            .await
            .map_err(DispatchError::from_store)?;
        alerts.sort_by_key(|a| a.reported_at);
        Ok(alerts)
    }

    /// A driver's personal assignment history, newest first, regardless of
    /// the alerts' current status.
    pub async fn list_assigned_to(&self, driver_id: Uuid) -> Result<Vec<Alert>> {
        let mut alerts = self
            .alert_repo()
            .list_assigned_to(driver_id)
            .await
            .map_err(DispatchError::from_store)?;
        alerts.sort_by_key(|a| std::cmp::Reverse(a.reported_at));
        Ok(alerts)
    }

    /// Everything for a privileged caller, otherwise only the caller's own
    /// reports. Newest first.
    pub async fn list_visible_to(
        &self,
        caller_id: Option<Uuid>,
        is_privileged: bool,
    ) -> Result<Vec<Alert>> {
        let mut alerts = if is_privileged {
            self.alert_repo()
                .list_all()
                .await
                .map_err(DispatchError::from_store)?
        } else if let Some(reporter_id) = caller_id {
            self.alert_repo()
                .list_by_reporter(reporter_id)
                .await
                .map_err(DispatchError::from_store)?
        } else {
            Vec::new()
        };
        alerts.sort_by_key(|a| std::cmp::Reverse(a.reported_at));
        Ok(alerts)
    }
}
