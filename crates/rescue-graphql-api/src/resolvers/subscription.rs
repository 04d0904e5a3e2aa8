//! # GraphQL Subscription Resolver
//!
//! Real-time event subscriptions for the AutoRescue dispatch API.

use async_graphql::{Context, ID, Subscription};
use futures_util::Stream;

use crate::context::ApiContext;
use crate::schema::*;

/// GraphQL Subscription root
pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    /// Subscribe to alert lifecycle events
    ///
    /// Emits an event on every status transition. Driver dashboards watch
    /// `DISPATCHED` to refresh the acceptance list and `ACCEPTED` to drop
    /// alerts another responder claimed.
    #[graphql(name = "alertEvents")]
    async fn alert_events(
        &self,
        ctx: &Context<'_>,
        #[graphql(desc = "Only emit events of this kind (default: all)")]
        kind: Option<AlertEventKind>,
    ) -> impl Stream<Item = AlertEvent> {
        let api_ctx = ctx.data::<ApiContext>().unwrap();
        let mut rx = api_ctx.alert_tx.subscribe();

        async_stream::stream! {
            while let Ok(event) = rx.recv().await {
                match kind {
                    None => yield event,
                    Some(wanted) if event.kind == wanted => yield event,
                    Some(_) => continue,
                }
            }
        }
    }

    /// Subscribe to driver location updates
    #[graphql(name = "driverLocationUpdates")]
    async fn driver_location_updates(
        &self,
        ctx: &Context<'_>,
        #[graphql(desc = "Driver ID to filter updates for (default: all)")]
        driver_id: Option<ID>,
    ) -> impl Stream<Item = DriverLocationEvent> {
        let api_ctx = ctx.data::<ApiContext>().unwrap();
        let mut rx = api_ctx.location_tx.subscribe();
        let filter_id = driver_id.map(|id| id.to_string());

        async_stream::stream! {
            while let Ok(event) = rx.recv().await {
                match &filter_id {
                    None => yield event,
                    Some(wanted) if event.driver_id.as_str() == wanted => yield event,
                    Some(_) => continue,
                }
            }
        }
    }

    /// Heartbeat subscription for connection keep-alive
    ///
    /// Emits a timestamp every second.
    #[graphql(name = "heartbeat")]
    async fn heartbeat(&self) -> impl Stream<Item = String> {
        async_stream::stream! {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
            loop {
                interval.tick().await;
                yield chrono::Utc::now().to_rfc3339();
            }
        }
    }
}
