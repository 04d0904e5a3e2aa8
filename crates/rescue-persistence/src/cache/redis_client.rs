//! # Redis Cache Layer
//!
//! Redis client wrapper with typed operations for dispatch caching.
//! The cache only accelerates reads; correctness of the dispatch state
//! machine never depends on it.

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::Result;
use rescue_domain::{Alert, Coordinates};

/// Cache TTL configuration
#[derive(Debug, Clone, Copy)]
pub struct CacheTtl {
    pub alert: Duration,
    pub dispatchable: Duration,
    pub driver_location: Duration,
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            alert: Duration::from_secs(30),
            // Dispatchable list goes stale the moment anyone accepts;
            // keep it short.
            dispatchable: Duration::from_secs(5),
            driver_location: Duration::from_secs(60),
        }
    }
}

/// Redis cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub url: String,
    pub pool_size: usize,
    pub ttl: CacheTtl,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 10,
            ttl: CacheTtl::default(),
        }
    }
}

/// Redis cache client with connection pooling
#[derive(Clone)]
pub struct CacheClient {
    conn: ConnectionManager,
    config: CacheConfig,
}

impl CacheClient {
    /// Create a new cache client
    pub async fn new(config: CacheConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        let conn = ConnectionManager::new(client).await?;

        Ok(Self { conn, config })
    }

    /// Get raw connection for advanced operations
    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }

    // =========================================================================
    // GENERIC OPERATIONS
    // =========================================================================

    /// Get a JSON value from cache
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;

        match value {
            Some(json) => {
                let parsed = serde_json::from_str(&json)?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    /// Set a JSON value in cache with TTL
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(value)?;
        let _: () = conn.set_ex(key, json, ttl.as_secs()).await?;
        Ok(())
    }

    /// Delete a key from cache
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let deleted: i64 = conn.del(key).await?;
        Ok(deleted > 0)
    }

    /// Delete multiple keys
    pub async fn delete_many(&self, keys: &[String]) -> Result<i64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let deleted: i64 = conn.del(keys).await?;
        Ok(deleted)
    }

    /// Check if key exists
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    // =========================================================================
    // ALERT OPERATIONS
    // =========================================================================

    /// Get a cached alert snapshot
    pub async fn get_alert(&self, alert_id: Uuid) -> Result<Option<Alert>> {
        let key = format!("alert:{alert_id}");
        self.get_json(&key).await
    }

    /// Cache an alert snapshot
    pub async fn set_alert(&self, alert: &Alert) -> Result<()> {
        let key = format!("alert:{}", alert.alert_id);
        self.set_json(&key, alert, self.config.ttl.alert).await
    }

    /// Get the cached dispatchable alert list
    pub async fn get_dispatchable(&self) -> Result<Option<Vec<Alert>>> {
        self.get_json("alerts:dispatchable").await
    }

    /// Cache the dispatchable alert list
    pub async fn set_dispatchable(&self, alerts: &[Alert]) -> Result<()> {
        self.set_json("alerts:dispatchable", &alerts, self.config.ttl.dispatchable)
            .await
    }

    /// Drop every cache entry a status transition may have invalidated
    pub async fn invalidate_alert(&self, alert_id: Uuid) -> Result<()> {
        let keys = vec![
            format!("alert:{alert_id}"),
            "alerts:dispatchable".to_string(),
        ];

        self.delete_many(&keys).await?;
        Ok(())
    }

    // =========================================================================
    // DRIVER LOCATION OPERATIONS
    // =========================================================================

    /// Cache a driver's last-known position
    pub async fn set_driver_location(&self, driver_id: Uuid, location: Coordinates) -> Result<()> {
        let key = format!("driver:location:{driver_id}");
        self.set_json(&key, &location, self.config.ttl.driver_location)
            .await
    }

    /// Get a driver's cached position
    pub async fn get_driver_location(&self, driver_id: Uuid) -> Result<Option<Coordinates>> {
        let key = format!("driver:location:{driver_id}");
        self.get_json(&key).await
    }

    /// Invalidate all cache keys for a driver
    pub async fn invalidate_driver(&self, driver_id: Uuid) -> Result<()> {
        let keys = vec![format!("driver:location:{driver_id}")];

        self.delete_many(&keys).await?;
        Ok(())
    }
}

/// Shared cache client wrapper
pub type SharedCacheClient = Arc<CacheClient>;

/// Create a shared cache client
pub fn shared_cache(client: CacheClient) -> SharedCacheClient {
    Arc::new(client)
}
