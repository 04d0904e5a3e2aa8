//! # API Configuration
//!
//! Environment-based configuration for the GraphQL API service.

use std::env;
use std::net::SocketAddr;

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Mutex-guarded in-process maps; no external dependencies
    Memory,
    /// ScyllaDB with lightweight-transaction conditional updates
    Scylla,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub server_addr: SocketAddr,

    /// Enable GraphQL Playground
    pub enable_playground: bool,

    /// Enable GraphQL introspection
    pub enable_introspection: bool,

    /// Maximum query depth
    pub max_query_depth: usize,

    /// Maximum query complexity
    pub max_query_complexity: usize,

    /// Which alert/driver store to run against
    pub storage: StorageBackend,

    /// ScyllaDB configuration (used when `storage` is `Scylla`)
    pub scylla: ScyllaSettings,

    /// Redis cache URL; cache layer disabled when unset
    pub redis_url: Option<String>,

    /// Logging level
    pub log_level: String,

    /// CORS allowed origins
    pub cors_origins: Vec<String>,
}

/// ScyllaDB connection configuration
#[derive(Debug, Clone)]
pub struct ScyllaSettings {
    pub hosts: Vec<String>,
    pub keyspace: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            server_addr: env::var("SERVER_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
                .parse()
                .expect("Invalid SERVER_ADDR"),

            enable_playground: env::var("ENABLE_PLAYGROUND")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),

            enable_introspection: env::var("ENABLE_INTROSPECTION")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),

            max_query_depth: env::var("MAX_QUERY_DEPTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),

            max_query_complexity: env::var("MAX_QUERY_COMPLEXITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),

            storage: match env::var("STORAGE_BACKEND").as_deref() {
                Ok("scylla") => StorageBackend::Scylla,
                _ => StorageBackend::Memory,
            },

            scylla: ScyllaSettings {
                hosts: env::var("SCYLLA_HOSTS")
                    .unwrap_or_else(|_| "127.0.0.1:9042".to_string())
                    .split(',')
                    .map(String::from)
                    .collect(),
                keyspace: env::var("SCYLLA_KEYSPACE")
                    .unwrap_or_else(|_| "rescue_ops".to_string()),
                username: env::var("SCYLLA_USERNAME").ok(),
                password: env::var("SCYLLA_PASSWORD").ok(),
            },

            redis_url: env::var("REDIS_URL").ok(),

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(String::from)
                .collect(),
        }
    }
}
