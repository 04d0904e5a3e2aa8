//! # AutoRescue GraphQL API Server
//!
//! Binary entry point for the dispatch gateway service.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rescue_dispatch::DispatchEngine;
use rescue_graphql_api::{ApiContext, Config, StorageBackend, build_router, build_schema};
use rescue_persistence::{
    AlertRepository, CacheClient, CacheConfig, DriverRepository, InMemoryAlertRepository,
    InMemoryDriverRepository,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!(
        version = rescue_graphql_api::VERSION,
        "Starting AutoRescue Dispatch API"
    );

    // Wire up the storage backend
    let (alerts, drivers): (Arc<dyn AlertRepository>, Arc<dyn DriverRepository>) =
        match config.storage {
            StorageBackend::Memory => {
                tracing::info!("Using in-memory storage backend");
                (
                    Arc::new(InMemoryAlertRepository::new()),
                    Arc::new(InMemoryDriverRepository::new()),
                )
            }
            StorageBackend::Scylla => {
                tracing::info!(
                    hosts = ?config.scylla.hosts,
                    keyspace = %config.scylla.keyspace,
                    "Connecting to ScyllaDB"
                );

                let scylla_config = rescue_persistence::ScyllaConfig {
                    hosts: config.scylla.hosts.clone(),
                    keyspace: config.scylla.keyspace.clone(),
                    username: config.scylla.username.clone(),
                    password: config.scylla.password.clone(),
                };

                let client = Arc::new(rescue_persistence::ScyllaClient::new(scylla_config).await?);
                tracing::info!("ScyllaDB connected");

                (
                    Arc::new(rescue_persistence::ScyllaAlertRepository::new(client.clone())),
                    Arc::new(rescue_persistence::ScyllaDriverRepository::new(client)),
                )
            }
        };

    // Optional Redis cache in front of the alert store
    let alerts: Arc<dyn AlertRepository> = if let Some(url) = config.redis_url.clone() {
        tracing::info!(url = %url, "Connecting to Redis");

        let cache_config = CacheConfig {
            url,
            ..Default::default()
        };
        let cache = CacheClient::new(cache_config).await?;
        tracing::info!("Redis connected");

        Arc::new(rescue_persistence::CachedAlertRepository::new(
            alerts,
            Arc::new(cache),
        ))
    } else {
        alerts
    };

    // Build the engine and API context
    let engine = DispatchEngine::new(alerts, drivers);
    let api_ctx = ApiContext::new(engine);

    // Build GraphQL schema
    let schema = build_schema(api_ctx);

    tracing::info!(
        playground = config.enable_playground,
        introspection = config.enable_introspection,
        max_depth = config.max_query_depth,
        max_complexity = config.max_query_complexity,
        "GraphQL schema built"
    );

    // Build router
    let app = build_router(schema);

    // Start server
    let addr = config.server_addr;
    tracing::info!(%addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("GraphQL Playground available at http://{}/graphql", addr);
    tracing::info!("WebSocket subscriptions at ws://{}/graphql/ws", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
