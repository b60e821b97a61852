//! Time-boxed reuse of decoded snapshots.

use super::loader::SnapshotLoader;
use crate::config::StorageConfig;
use crate::error::LoadError;
use crate::models::ProcessRecord;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

struct CachedSnapshot {
    records: Arc<Vec<ProcessRecord>>,
    loaded_at: Instant,
}

/// Record source shared by all queries.
///
/// With a zero TTL every call goes back to disk. Failed loads are never cached.
pub struct RecordStore {
    loader: SnapshotLoader,
    ttl: Duration,
    cached: Mutex<Option<CachedSnapshot>>,
}

impl RecordStore {
    pub fn new(loader: SnapshotLoader, ttl: Duration) -> Self {
        Self {
            loader,
            ttl,
            cached: Mutex::new(None),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(SnapshotLoader::from_config(config), config.cache_ttl())
    }

    pub fn loader(&self) -> &SnapshotLoader {
        &self.loader
    }

    /// Current records, from the cache when it is still fresh.
    pub async fn records(&self) -> Result<Arc<Vec<ProcessRecord>>, LoadError> {
        if self.ttl.is_zero() {
            return Ok(Arc::new(self.loader.load_records().await?));
        }

        let mut cached = self.cached.lock().await;
        if let Some(snapshot) = cached.as_ref() {
            if snapshot.loaded_at.elapsed() < self.ttl {
                debug!("Serving {} cached records", snapshot.records.len());
                return Ok(Arc::clone(&snapshot.records));
            }
        }

        let records = Arc::new(self.loader.load_records().await?);
        *cached = Some(CachedSnapshot {
            records: Arc::clone(&records),
            loaded_at: Instant::now(),
        });

        Ok(records)
    }
}
