//! # AutoRescue GraphQL API
//!
//! GraphQL gateway for the AutoRescue alert dispatch engine.
//!
//! ## Features
//!
//! - **Alert lifecycle**: report, verify, dispatch, accept, resolve
//! - **Race-safe accepts**: concurrent claims resolve to one winner
//! - **Driver tracking**: availability and last-known location
//! - **Subscriptions**: real-time lifecycle events via WebSocket
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Axum HTTP Server                         │
//! │              (GraphQL Endpoint + Playground)                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                async-graphql Schema                         │
//! │           (QueryRoot, MutationRoot, SubscriptionRoot)       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              ApiContext + CallerIdentity                    │
//! │        (DispatchEngine, Broadcast Channels, Auth facts)     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     DispatchEngine                          │
//! │        (state machine + conditional-update commits)         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod context;
pub mod error;
pub mod resolvers;
pub mod schema;

use async_graphql::Schema;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse, GraphQLSubscription};
use axum::{
    Router,
    extract::State,
    http::{HeaderMap, Method},
    response::{Html, IntoResponse},
    routing::get,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{Config, StorageBackend};
pub use context::{ApiContext, CallerIdentity, Role};
pub use error::{ApiError, ApiResult};
pub use resolvers::{MutationRoot, QueryRoot, SubscriptionRoot};

/// GraphQL schema type
pub type ApiSchema = Schema<QueryRoot, MutationRoot, SubscriptionRoot>;

/// Build the GraphQL schema with context
pub fn build_schema(ctx: ApiContext) -> ApiSchema {
    Schema::build(QueryRoot, MutationRoot, SubscriptionRoot)
        .data(ctx)
        .limit_depth(10)
        .limit_complexity(1000)
        .finish()
}

/// Application state for Axum handlers
#[derive(Clone)]
pub struct AppState {
    pub schema: ApiSchema,
}

/// GraphQL endpoint handler
///
/// Identity headers are resolved here, before the schema executes, so
/// resolvers only ever see already-validated facts.
pub async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let identity = CallerIdentity::from_headers(&headers);
    state
        .schema
        .execute(req.into_inner().data(identity))
        .await
        .into()
}

/// GraphQL Playground HTML
pub async fn graphql_playground() -> impl IntoResponse {
    Html(
        async_graphql::http::playground_source(
            async_graphql::http::GraphQLPlaygroundConfig::new("/graphql")
                .subscription_endpoint("/graphql/ws"),
        ),
    )
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    "OK"
}

/// Build the Axum router
pub fn build_router(schema: ApiSchema) -> Router {
    let state = AppState {
        schema: schema.clone(),
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        // GraphQL endpoints
        .route("/graphql", get(graphql_playground).post(graphql_handler))
        .route_service("/graphql/ws", GraphQLSubscription::new(schema))
        // Health check
        .route("/health", get(health_check))
        .route("/", get(|| async { "AutoRescue Dispatch API" }))
        // State and middleware
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use rescue_dispatch::DispatchEngine;
    use rescue_persistence::{InMemoryAlertRepository, InMemoryDriverRepository};
    use std::sync::Arc;
    use uuid::Uuid;

    fn memory_schema() -> ApiSchema {
        let engine = DispatchEngine::new(
            Arc::new(InMemoryAlertRepository::new()),
            Arc::new(InMemoryDriverRepository::new()),
        );
        build_schema(ApiContext::new(engine))
    }

    fn as_admin(query: &str) -> async_graphql::Request {
        async_graphql::Request::new(query).data(CallerIdentity {
            caller_id: Some(Uuid::new_v4()),
            role: Role::Admin,
        })
    }

    #[tokio::test]
    async fn test_health_query() {
        let schema = memory_schema();
        let response = schema.execute("{ health version }").await;
        assert!(response.errors.is_empty());
        let json = response.data.into_json().unwrap();
        assert_eq!(json["health"], "OK");
    }

    #[tokio::test]
    async fn test_lifecycle_through_graphql() {
        let schema = memory_schema();

        // Report as an ordinary user
        let reporter = CallerIdentity {
            caller_id: Some(Uuid::new_v4()),
            role: Role::Reporter,
        };
        let response = schema
            .execute(
                async_graphql::Request::new(
                    r#"mutation {
                        createAlert(input: {
                            latitude: 40.7128, longitude: -74.0060,
                            impactMagnitude: 30.5
                        }) { id status alertType }
                    }"#,
                )
                .data(reporter),
            )
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let json = response.data.into_json().unwrap();
        assert_eq!(json["createAlert"]["status"], "PENDING");
        assert_eq!(json["createAlert"]["alertType"], "ACCIDENT");
        let alert_id = json["createAlert"]["id"].as_str().unwrap().to_string();

        // Verify and dispatch as admin
        let response = schema
            .execute(as_admin(&format!(
                r#"mutation {{ verifyAlert(alertId: "{alert_id}") {{ status }} }}"#
            )))
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);

        let response = schema
            .execute(as_admin(&format!(
                r#"mutation {{ dispatchAlert(alertId: "{alert_id}") {{ status }} }}"#
            )))
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);

        // Register a driver and accept
        let response = schema
            .execute(as_admin(
                r#"mutation { registerDriver(input: { externalId: "AMB001" }) { id isAvailable } }"#,
            ))
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let json = response.data.into_json().unwrap();
        let driver_id = json["registerDriver"]["id"].as_str().unwrap().to_string();

        let driver = CallerIdentity {
            caller_id: Some(Uuid::parse_str(&driver_id).unwrap()),
            role: Role::Driver,
        };
        let response = schema
            .execute(
                async_graphql::Request::new(format!(
                    r#"mutation {{
                        acceptAlert(input: {{ alertId: "{alert_id}", driverId: "{driver_id}" }}) {{
                            status assignedDriverId
                        }}
                    }}"#
                ))
                .data(driver),
            )
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let json = response.data.into_json().unwrap();
        assert_eq!(json["acceptAlert"]["status"], "ACCEPTED");
        assert_eq!(json["acceptAlert"]["assignedDriverId"], driver_id.as_str());
    }

    #[tokio::test]
    async fn test_privileged_mutations_reject_unprivileged_callers() {
        let schema = memory_schema();
        let alert_id = Uuid::new_v4();

        let driver = CallerIdentity {
            caller_id: Some(Uuid::new_v4()),
            role: Role::Driver,
        };
        let response = schema
            .execute(
                async_graphql::Request::new(format!(
                    r#"mutation {{ verifyAlert(alertId: "{alert_id}") {{ status }} }}"#
                ))
                .data(driver),
            )
            .await;

        assert_eq!(response.errors.len(), 1);
        assert!(response.errors[0].message.contains("privileged"));
    }

    #[tokio::test]
    async fn test_driver_cannot_accept_for_someone_else() {
        let schema = memory_schema();
        let impostor = CallerIdentity {
            caller_id: Some(Uuid::new_v4()),
            role: Role::Driver,
        };
        let other_driver = Uuid::new_v4();
        let alert_id = Uuid::new_v4();

        let response = schema
            .execute(
                async_graphql::Request::new(format!(
                    r#"mutation {{
                        acceptAlert(input: {{ alertId: "{alert_id}", driverId: "{other_driver}" }}) {{ status }}
                    }}"#
                ))
                .data(impostor),
            )
            .await;

        assert_eq!(response.errors.len(), 1);
        assert!(response.errors[0].message.contains("not this driver"));
    }
}
