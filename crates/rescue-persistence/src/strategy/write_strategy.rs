//! Write strategy implementations using enum dispatch.

use std::fmt::Debug;
use std::future::Future;

use super::read_strategy::{CacheError, DbError};

/// Write strategy enum - determines cache/db write pattern.
#[derive(Debug, Clone, Copy, Default)]
pub enum WriteStrategy {
    /// Write to DB only, invalidate cache
    #[default]
    WriteAround,
    /// Write to both cache and DB synchronously
    WriteThrough,
    /// Write to DB only, no cache interaction
    DbOnly,
}

impl WriteStrategy {
    /// Execute a write operation according to the strategy.
    ///
    /// - `cache_fn`: Async function to write to cache
    /// - `db_fn`: Async function to write to database
    /// - `invalidate_fn`: Optional async function to invalidate cache
    ///
    /// The DB write is authoritative; cache failures are logged, never
    /// propagated.
    pub async fn write<T, CacheFut, DbFut, InvalidateFut>(
        &self,
        value: &T,
        cache_fn: impl FnOnce(&T) -> CacheFut,
        db_fn: impl FnOnce(&T) -> DbFut,
        invalidate_fn: Option<impl FnOnce() -> InvalidateFut>,
    ) -> Result<(), WriteError>
    where
        T: Debug,
        CacheFut: Future<Output = Result<(), CacheError>>,
        DbFut: Future<Output = Result<(), DbError>>,
        InvalidateFut: Future<Output = Result<(), CacheError>>,
    {
        match self {
            WriteStrategy::WriteAround => {
                db_fn(value).await.map_err(WriteError::Database)?;

                if let Some(invalidate) = invalidate_fn {
                    if let Err(e) = invalidate().await {
                        tracing::warn!(error = %e, "Failed to invalidate cache");
                    }
                }

                Ok(())
            }

            WriteStrategy::WriteThrough => {
                db_fn(value).await.map_err(WriteError::Database)?;

                if let Err(e) = cache_fn(value).await {
                    tracing::warn!(error = %e, "Failed to write to cache");
                }

                Ok(())
            }

            WriteStrategy::DbOnly => db_fn(value).await.map_err(WriteError::Database),
        }
    }
}

/// Write operation error.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_write_around_invalidates_instead_of_writing() {
        let strategy = WriteStrategy::WriteAround;
        let cache_written = Arc::new(AtomicBool::new(false));
        let invalidated = Arc::new(AtomicBool::new(false));

        let cache_flag = cache_written.clone();
        let invalidate_flag = invalidated.clone();

        strategy
            .write(
                &42,
                |_| {
                    cache_flag.store(true, Ordering::SeqCst);
                    async { Ok(()) }
                },
                |_| async { Ok(()) },
                Some(|| {
                    invalidate_flag.store(true, Ordering::SeqCst);
                    async { Ok(()) }
                }),
            )
            .await
            .unwrap();

        assert!(!cache_written.load(Ordering::SeqCst));
        assert!(invalidated.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_write_through_hits_both() {
        let strategy = WriteStrategy::WriteThrough;
        let cache_written = Arc::new(AtomicBool::new(false));
        let db_written = Arc::new(AtomicBool::new(false));

        let cache_flag = cache_written.clone();
        let db_flag = db_written.clone();

        strategy
            .write(
                &42,
                |_| {
                    cache_flag.store(true, Ordering::SeqCst);
                    async { Ok(()) }
                },
                |_| {
                    db_flag.store(true, Ordering::SeqCst);
                    async { Ok(()) }
                },
                None::<fn() -> std::future::Ready<Result<(), CacheError>>>,
            )
            .await
            .unwrap();

        assert!(cache_written.load(Ordering::SeqCst));
        assert!(db_written.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_db_failure_propagates() {
        let strategy = WriteStrategy::DbOnly;

        let result = strategy
            .write(
                &42,
                |_| async { Ok(()) },
                |_| async { Err(DbError("node unreachable".into())) },
                None::<fn() -> std::future::Ready<Result<(), CacheError>>>,
            )
            .await;

        assert!(matches!(result, Err(WriteError::Database(_))));
    }
}
