use super::pool::{DatasetPool, PooledConnection, ReadOnlyManager};
use crate::config::DatasetSettings;
use crate::errors::CoreError;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Maps a physical dataset name to a pool of read-only connections.
///
/// Pools are created lazily on first use and kept in a small LRU cache.
/// Concurrent first requests for the same name share one initialization; a
/// failed initialization is not cached, so the next call tries again.
pub struct DatasetRegistry {
    datasets_dir: PathBuf,
    pool_size: usize,
    pools: Cache<String, Arc<DatasetPool>>,
    pools_created: AtomicUsize,
}

impl DatasetRegistry {
    pub fn new(datasets_dir: impl Into<PathBuf>, pool_size: usize, capacity: u64) -> Self {
        let pools = Cache::builder()
            .max_capacity(capacity.max(1))
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self {
            datasets_dir: datasets_dir.into(),
            pool_size: pool_size.max(1),
            pools,
            pools_created: AtomicUsize::new(0),
        }
    }

    pub fn from_settings(settings: &DatasetSettings) -> Self {
        Self::new(&settings.dir, settings.pool_size, settings.cache_capacity)
    }

    pub fn datasets_dir(&self) -> &Path {
        &self.datasets_dir
    }

    /// Returns the cached pool for `db_name`, creating it on first access.
    pub fn pool(&self, db_name: &str) -> Result<Arc<DatasetPool>, CoreError> {
        validate_db_name(db_name)?;
        self.pools
            .try_get_with(db_name.to_string(), || self.build_pool(db_name))
            .map_err(|reason| CoreError::dataset_unavailable(db_name, reason.as_str()))
    }

    /// Checks out a live read-only connection for `db_name`.
    pub async fn get_connection(&self, db_name: &str) -> Result<PooledConnection, CoreError> {
        let pool = self.pool(db_name)?;
        pool.get().await.map_err(|e| {
            tracing::warn!(
                event = "dataset.checkout_failed",
                db_name = %db_name,
                error = %e
            );
            CoreError::dataset_unavailable(db_name, e)
        })
    }

    /// Runs `f` against a pooled connection on the blocking thread pool.
    pub async fn with_connection<T, F>(&self, db_name: &str, f: F) -> Result<T, CoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, CoreError> + Send + 'static,
    {
        let conn = self.get_connection(db_name).await?;
        tokio::task::spawn_blocking(move || f(&*conn))
            .await
            .map_err(|e| CoreError::dataset_unavailable(db_name, format!("worker failed: {e}")))?
    }

    /// Number of pools built since startup, including ones later evicted.
    pub fn pools_created(&self) -> usize {
        self.pools_created.load(Ordering::Relaxed)
    }

    pub fn cached_pools(&self) -> u64 {
        self.pools.run_pending_tasks();
        self.pools.entry_count()
    }

    fn build_pool(&self, db_name: &str) -> Result<Arc<DatasetPool>, String> {
        let path = self.datasets_dir.join(format!("{db_name}.db"));
        if !path.is_file() {
            return Err(format!("dataset file not found: {}", path.display()));
        }

        let pool = DatasetPool::builder(ReadOnlyManager::new(&path))
            .max_size(self.pool_size)
            .build()
            .map_err(|e| format!("failed to build pool: {e}"))?;

        self.pools_created.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            event = "dataset.pool_created",
            db_name = %db_name,
            max_size = self.pool_size
        );
        Ok(Arc::new(pool))
    }
}

/// Dataset names become file names, so only a conservative charset is allowed.
fn validate_db_name(db_name: &str) -> Result<(), CoreError> {
    let ok = !db_name.is_empty()
        && db_name.len() <= 128
        && db_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(CoreError::dataset_unavailable(
            db_name,
            "invalid dataset name (allowed: letters, digits, '_' and '-')",
        ))
    }
}
