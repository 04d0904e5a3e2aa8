//! # GraphQL Query Resolver
//!
//! Read operations for the AutoRescue dispatch API.

use async_graphql::{Context, ID, Object, Result};
use uuid::Uuid;

use crate::context::{ApiContext, CallerIdentity, Role};
use crate::error::ApiError;
use crate::schema::*;
use rescue_dispatch::DispatchError;

/// GraphQL Query root
pub struct QueryRoot;

fn identity(ctx: &Context<'_>) -> CallerIdentity {
    ctx.data_opt::<CallerIdentity>().copied().unwrap_or_default()
}

#[Object]
impl QueryRoot {
    // =========================================================================
    // ALERT QUERIES
    // =========================================================================

    /// Fetch one alert by id
    ///
    /// Visible to privileged callers, the reporter, and the assignee.
    #[graphql(name = "alert")]
    async fn get_alert(&self, ctx: &Context<'_>, alert_id: ID) -> Result<Option<Alert>> {
        let api_ctx = ctx.data::<ApiContext>()?;
        let caller = identity(ctx);
        let alert_uuid = Uuid::parse_str(&alert_id).map_err(ApiError::from)?;

        let alert = match api_ctx.engine.get_alert(alert_uuid).await {
            Ok(alert) => alert,
            Err(DispatchError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(ApiError::from(e).into()),
        };

        let involved = caller.caller_id.is_some()
            && (alert.reporter_id == caller.caller_id
                || alert.assigned_driver_id == caller.caller_id);
        if !caller.is_admin() && !involved {
            return Err(ApiError::Unauthorized(
                "alert is not visible to this caller".to_string(),
            )
            .into());
        }

        Ok(Some(Alert::from(alert)))
    }

    /// Alerts visible to the caller, newest first
    ///
    /// Privileged callers see everything; reporters see their own reports.
    #[graphql(name = "alerts")]
    async fn get_alerts(&self, ctx: &Context<'_>) -> Result<Vec<Alert>> {
        let api_ctx = ctx.data::<ApiContext>()?;
        let caller = identity(ctx);

        tracing::debug!(
            caller_id = ?caller.caller_id,
            privileged = caller.is_admin(),
            "Listing visible alerts"
        );

        let alerts = api_ctx
            .engine
            .list_visible_to(caller.caller_id, caller.is_admin())
            .await
            .map_err(ApiError::from)?;

        Ok(alerts.into_iter().map(Alert::from).collect())
    }

    /// Alerts open for acceptance, oldest pending response first
    #[graphql(name = "dispatchableAlerts")]
    async fn get_dispatchable_alerts(&self, ctx: &Context<'_>) -> Result<Vec<Alert>> {
        let api_ctx = ctx.data::<ApiContext>()?;
        let caller = identity(ctx);

        if caller.role != Role::Driver && !caller.is_admin() {
            return Err(ApiError::Unauthorized(
                "driver or privileged caller required".to_string(),
            )
            .into());
        }

        let alerts = api_ctx
            .engine
            .list_dispatchable()
            .await
            .map_err(ApiError::from)?;

        Ok(alerts.into_iter().map(Alert::from).collect())
    }

    /// The calling driver's assignment history, newest first
    #[graphql(name = "myAssignments")]
    async fn get_my_assignments(&self, ctx: &Context<'_>) -> Result<Vec<Alert>> {
        let api_ctx = ctx.data::<ApiContext>()?;
        let caller = identity(ctx);
        let driver_id = caller.require_authenticated()?;
        caller.require_driver(driver_id)?;

        let alerts = api_ctx
            .engine
            .list_assigned_to(driver_id)
            .await
            .map_err(ApiError::from)?;

        Ok(alerts.into_iter().map(Alert::from).collect())
    }

    // =========================================================================
    // DRIVER QUERIES
    // =========================================================================

    /// Fetch one driver by id (self or privileged)
    #[graphql(name = "driver")]
    async fn get_driver(&self, ctx: &Context<'_>, driver_id: ID) -> Result<Option<Driver>> {
        let api_ctx = ctx.data::<ApiContext>()?;
        let driver_uuid = Uuid::parse_str(&driver_id).map_err(ApiError::from)?;
        identity(ctx).require_driver(driver_uuid)?;

        match api_ctx.engine.get_driver(driver_uuid).await {
            Ok(driver) => Ok(Some(Driver::from(driver))),
            Err(DispatchError::NotFound { .. }) => Ok(None),
            Err(e) => Err(ApiError::from(e).into()),
        }
    }

    // =========================================================================
    // HEALTH CHECK
    // =========================================================================

    /// API health check
    #[graphql(name = "health")]
    async fn health(&self) -> Result<String> {
        Ok("OK".to_string())
    }

    /// API version
    #[graphql(name = "version")]
    async fn version(&self) -> Result<String> {
        Ok(env!("CARGO_PKG_VERSION").to_string())
    }
}
