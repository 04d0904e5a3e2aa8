//! # GraphQL Mutation Resolver
//!
//! Write operations for the AutoRescue dispatch API. Every mutation runs
//! one engine operation; the engine's conditional updates decide races,
//! the resolver only translates results and broadcasts events.

use async_graphql::{Context, ID, Object, Result};
use uuid::Uuid;

use crate::context::{ApiContext, CallerIdentity};
use crate::error::ApiError;
use crate::schema::*;
use rescue_dispatch::NewAlert;
use rescue_domain::AlertType;

/// GraphQL Mutation root
pub struct MutationRoot;

fn identity(ctx: &Context<'_>) -> CallerIdentity {
    ctx.data_opt::<CallerIdentity>().copied().unwrap_or_default()
}

#[Object]
impl MutationRoot {
    // =========================================================================
    // REPORTING MUTATIONS
    // =========================================================================

    /// Report a new emergency alert
    ///
    /// The alert starts in `PENDING` and is invisible to drivers until a
    /// dispatcher verifies and dispatches it.
    #[graphql(name = "createAlert")]
    async fn create_alert(&self, ctx: &Context<'_>, input: CreateAlertInput) -> Result<Alert> {
        let api_ctx = ctx.data::<ApiContext>()?;
        let caller = identity(ctx);
        let reporter_id = caller.require_authenticated()?;

        let alert_type = input
            .alert_type
            .as_deref()
            .unwrap_or("ACCIDENT")
            .parse::<AlertType>()
            .unwrap_or(AlertType::Accident);

        tracing::info!(
            reporter_id = %reporter_id,
            alert_type = %alert_type,
            lat = input.latitude,
            lon = input.longitude,
            "Creating alert"
        );

        let alert = api_ctx
            .engine
            .create_alert(NewAlert {
                alert_type,
                latitude: input.latitude,
                longitude: input.longitude,
                details: input.details,
                impact_magnitude: input.impact_magnitude,
                reporter_id: Some(reporter_id),
            })
            .await
            .map_err(ApiError::from)?;

        let alert = Alert::from(alert);
        let _ = api_ctx
            .alert_tx
            .send(AlertEvent::now(AlertEventKind::Created, alert.clone()));

        Ok(alert)
    }

    // =========================================================================
    // DISPATCHER MUTATIONS
    // =========================================================================

    /// Confirm a pending alert as genuine (privileged)
    #[graphql(name = "verifyAlert")]
    async fn verify_alert(&self, ctx: &Context<'_>, alert_id: ID) -> Result<Alert> {
        let api_ctx = ctx.data::<ApiContext>()?;
        identity(ctx).require_admin()?;
        let alert_uuid = Uuid::parse_str(&alert_id).map_err(ApiError::from)?;

        tracing::info!(alert_id = %alert_uuid, "Verifying alert");

        let alert = api_ctx
            .engine
            .verify(alert_uuid)
            .await
            .map_err(ApiError::from)?;

        let alert = Alert::from(alert);
        let _ = api_ctx
            .alert_tx
            .send(AlertEvent::now(AlertEventKind::Verified, alert.clone()));

        Ok(alert)
    }

    /// Release a verified alert to the driver pool (privileged)
    #[graphql(name = "dispatchAlert")]
    async fn dispatch_alert(&self, ctx: &Context<'_>, alert_id: ID) -> Result<Alert> {
        let api_ctx = ctx.data::<ApiContext>()?;
        identity(ctx).require_admin()?;
        let alert_uuid = Uuid::parse_str(&alert_id).map_err(ApiError::from)?;

        tracing::info!(alert_id = %alert_uuid, "Dispatching alert");

        let alert = api_ctx
            .engine
            .dispatch(alert_uuid)
            .await
            .map_err(ApiError::from)?;

        let alert = Alert::from(alert);
        let _ = api_ctx
            .alert_tx
            .send(AlertEvent::now(AlertEventKind::Dispatched, alert.clone()));

        Ok(alert)
    }

    /// Close a false alarm before any responder accepted it (privileged)
    #[graphql(name = "adminResolveAlert")]
    async fn admin_resolve_alert(&self, ctx: &Context<'_>, alert_id: ID) -> Result<Alert> {
        let api_ctx = ctx.data::<ApiContext>()?;
        identity(ctx).require_admin()?;
        let alert_uuid = Uuid::parse_str(&alert_id).map_err(ApiError::from)?;

        tracing::info!(alert_id = %alert_uuid, "Resolving alert administratively");

        let alert = api_ctx
            .engine
            .admin_resolve(alert_uuid)
            .await
            .map_err(ApiError::from)?;

        let alert = Alert::from(alert);
        let _ = api_ctx
            .alert_tx
            .send(AlertEvent::now(AlertEventKind::AdminResolved, alert.clone()));

        Ok(alert)
    }

    /// Register a new driver with the dispatcher pool (privileged)
    #[graphql(name = "registerDriver")]
    async fn register_driver(
        &self,
        ctx: &Context<'_>,
        input: RegisterDriverInput,
    ) -> Result<Driver> {
        let api_ctx = ctx.data::<ApiContext>()?;
        identity(ctx).require_admin()?;

        let driver = api_ctx
            .engine
            .register_driver(input.external_id)
            .await
            .map_err(ApiError::from)?;

        Ok(Driver::from(driver))
    }

    // =========================================================================
    // DRIVER MUTATIONS
    // =========================================================================

    /// Claim exclusive responsibility for a dispatched alert
    ///
    /// Exactly one of any number of racing claims succeeds; the rest get
    /// an `ALREADY_ASSIGNED` error and no state changes.
    #[graphql(name = "acceptAlert")]
    async fn accept_alert(&self, ctx: &Context<'_>, input: AcceptAlertInput) -> Result<Alert> {
        let api_ctx = ctx.data::<ApiContext>()?;
        let alert_uuid = Uuid::parse_str(&input.alert_id).map_err(ApiError::from)?;
        let driver_uuid = Uuid::parse_str(&input.driver_id).map_err(ApiError::from)?;
        identity(ctx).require_driver(driver_uuid)?;

        tracing::info!(
            alert_id = %alert_uuid,
            driver_id = %driver_uuid,
            "Driver accepting alert"
        );

        let alert = api_ctx
            .engine
            .accept_alert(alert_uuid, driver_uuid)
            .await
            .map_err(ApiError::from)?;

        let alert = Alert::from(alert);
        let _ = api_ctx
            .alert_tx
            .send(AlertEvent::now(AlertEventKind::Accepted, alert.clone()));

        Ok(alert)
    }

    /// Close out an accepted alert (assignee only)
    #[graphql(name = "resolveAlert")]
    async fn resolve_alert(&self, ctx: &Context<'_>, input: ResolveAlertInput) -> Result<Alert> {
        let api_ctx = ctx.data::<ApiContext>()?;
        let alert_uuid = Uuid::parse_str(&input.alert_id).map_err(ApiError::from)?;
        let driver_uuid = Uuid::parse_str(&input.driver_id).map_err(ApiError::from)?;
        identity(ctx).require_driver(driver_uuid)?;

        tracing::info!(
            alert_id = %alert_uuid,
            driver_id = %driver_uuid,
            "Driver resolving alert"
        );

        let alert = api_ctx
            .engine
            .resolve_alert(alert_uuid, driver_uuid)
            .await
            .map_err(ApiError::from)?;

        let alert = Alert::from(alert);
        let _ = api_ctx
            .alert_tx
            .send(AlertEvent::now(AlertEventKind::Resolved, alert.clone()));

        Ok(alert)
    }

    /// Overwrite a driver's last-known position (last write wins)
    #[graphql(name = "updateDriverLocation")]
    async fn update_driver_location(
        &self,
        ctx: &Context<'_>,
        input: UpdateDriverLocationInput,
    ) -> Result<Driver> {
        let api_ctx = ctx.data::<ApiContext>()?;
        let driver_uuid = Uuid::parse_str(&input.driver_id).map_err(ApiError::from)?;
        identity(ctx).require_driver(driver_uuid)?;

        tracing::debug!(
            driver_id = %driver_uuid,
            lat = input.latitude,
            lon = input.longitude,
            "Updating driver location"
        );

        let driver = api_ctx
            .engine
            .update_driver_location(driver_uuid, input.latitude, input.longitude)
            .await
            .map_err(ApiError::from)?;

        let driver = Driver::from(driver);
        if let Some(location) = driver.location {
            let _ = api_ctx.location_tx.send(DriverLocationEvent {
                driver_id: driver.id.clone(),
                location,
                timestamp: chrono::Utc::now(),
            });
        }

        Ok(driver)
    }
}
