//! Cached repository wrapper.
//!
//! Decorates an [`AlertRepository`] with the Redis cache layer, applying
//! the read/write strategies. Conditional transitions always go straight
//! to the backing store; the cache is invalidated after a committed CAS so
//! drivers never accept off a stale dispatchable list for long.

use std::sync::Arc;
use uuid::Uuid;

use async_trait::async_trait;

use crate::cache::SharedCacheClient;
use crate::error::{PersistenceError, Result};
use crate::repository::traits::{AlertRepository, CasOutcome, StatusChange};
use crate::strategy::{CacheError, DbError, ReadError, ReadStrategy, WriteError, WriteStrategy};
use rescue_domain::{Alert, AlertStatus};

/// Alert repository decorated with the Redis cache.
pub struct CachedAlertRepository {
    inner: Arc<dyn AlertRepository>,
    cache: SharedCacheClient,
    read_strategy: ReadStrategy,
    write_strategy: WriteStrategy,
}

impl CachedAlertRepository {
    /// Wrap a repository with default strategies.
    pub fn new(inner: Arc<dyn AlertRepository>, cache: SharedCacheClient) -> Self {
        Self {
            inner,
            cache,
            read_strategy: ReadStrategy::CacheFirst,
            write_strategy: WriteStrategy::WriteAround,
        }
    }

    /// Create with custom strategies.
    pub fn with_strategies(
        inner: Arc<dyn AlertRepository>,
        cache: SharedCacheClient,
        read_strategy: ReadStrategy,
        write_strategy: WriteStrategy,
    ) -> Self {
        Self {
            inner,
            cache,
            read_strategy,
            write_strategy,
        }
    }
}

fn cache_err(e: PersistenceError) -> CacheError {
    CacheError(Box::new(e))
}

fn db_err(e: PersistenceError) -> DbError {
    DbError(Box::new(e))
}

/// Recover the original persistence error from a strategy error.
fn from_read_err(e: ReadError) -> PersistenceError {
    match e {
        ReadError::Database(DbError(inner)) => match inner.downcast::<PersistenceError>() {
            Ok(pe) => *pe,
            Err(other) => PersistenceError::Scylla(other.to_string()),
        },
        ReadError::Cache(c) => PersistenceError::Redis(c.to_string()),
    }
}

fn from_write_err(e: WriteError) -> PersistenceError {
    match e {
        WriteError::Database(DbError(inner)) => match inner.downcast::<PersistenceError>() {
            Ok(pe) => *pe,
            Err(other) => PersistenceError::Scylla(other.to_string()),
        },
        WriteError::Cache(c) => PersistenceError::Redis(c.to_string()),
    }
}

#[async_trait]
impl AlertRepository for CachedAlertRepository {
    async fn get(&self, alert_id: Uuid) -> Result<Option<Alert>> {
        let cache = &self.cache;
        let inner = &self.inner;

        self.read_strategy
            .read(
                || async move { cache.get_alert(alert_id).await.map_err(cache_err) },
                || async move { inner.get(alert_id).await.map_err(db_err) },
                Some(|alert: Alert| async move {
                    cache.set_alert(&alert).await.map_err(cache_err)
                }),
            )
            .await
            .map_err(from_read_err)
    }

    async fn create(&self, alert: &Alert) -> Result<()> {
        let cache = &self.cache;
        let inner = &self.inner;
        let alert_id = alert.alert_id;

        self.write_strategy
            .write(
                alert,
                |_| async move { cache.set_alert(alert).await.map_err(cache_err) },
                |_| async move { inner.create(alert).await.map_err(db_err) },
                Some(|| async move {
                    cache.invalidate_alert(alert_id).await.map_err(cache_err)
                }),
            )
            .await
            .map_err(from_write_err)
    }

    async fn conditional_transition(
        &self,
        alert_id: Uuid,
        expected: AlertStatus,
        change: StatusChange,
    ) -> Result<CasOutcome> {
        let outcome = self
            .inner
            .conditional_transition(alert_id, expected, change)
            .await?;

        if outcome.committed() {
            if let Err(e) = self.cache.invalidate_alert(alert_id).await {
                tracing::warn!(error = %e, %alert_id, "Failed to invalidate alert cache");
            }
        }

        Ok(outcome)
    }

    async fn list_by_status(&self, status: AlertStatus) -> Result<Vec<Alert>> {
        // Only the dispatchable pool is hot enough to cache
        if status != AlertStatus::Dispatched {
            return self.inner.list_by_status(status).await;
        }

        let cache = &self.cache;
        let inner = &self.inner;

        let listed = self
            .read_strategy
            .read(
                || async move { cache.get_dispatchable().await.map_err(cache_err) },
                || async move {
                    inner
                        .list_by_status(AlertStatus::Dispatched)
                        .await
                        .map(Some)
                        .map_err(db_err)
                },
                Some(|alerts: Vec<Alert>| async move {
                    cache.set_dispatchable(&alerts).await.map_err(cache_err)
                }),
            )
            .await
            .map_err(from_read_err)?;

        Ok(listed.unwrap_or_default())
    }

    async fn list_assigned_to(&self, driver_id: Uuid) -> Result<Vec<Alert>> {
        self.inner.list_assigned_to(driver_id).await
    }

    async fn list_by_reporter(&self, reporter_id: Uuid) -> Result<Vec<Alert>> {
        self.inner.list_by_reporter(reporter_id).await
    }

    async fn list_all(&self) -> Result<Vec<Alert>> {
        self.inner.list_all().await
    }
}
