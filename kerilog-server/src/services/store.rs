use std::sync::Arc;

use async_trait::async_trait;
use kerilog_api::TelemetryPoint;

use crate::configs::Storage;
use crate::errors::StorageError;
use crate::models::DataPoint;
use crate::repositories::DataPointRepository;

/// Append-only time-series sink
#[async_trait]
pub trait PointStore: Send + Sync {
    /// Writes all points or none. Points whose `(series, timestamp)` is
    /// already stored are skipped; returns how many were written.
    async fn append_points(&self, points: &[TelemetryPoint]) -> Result<usize, StorageError>;

    /// Persists anything still buffered, called once on shutdown
    async fn flush(&self) -> Result<(), StorageError>;
}

pub struct SqliteStore {
    storage: Arc<Storage>,
    data_point_repository: DataPointRepository,
}

impl SqliteStore {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            data_point_repository: DataPointRepository::new(storage.clone()),
            storage,
        }
    }
}

#[async_trait]
impl PointStore for SqliteStore {
    async fn append_points(&self, points: &[TelemetryPoint]) -> Result<usize, StorageError> {
        let mut tx = self.storage.get_pool().begin().await?;
        let mut inserted = 0;

        for point in points {
            if self.data_point_repository.insert_ignore(&DataPoint::from(point), &mut tx).await? == 0 {
                tracing::debug!("duplicate point {}@{} skipped", point.series, point.timestamp);
            } else {
                inserted += 1;
            }
        }

        tx.commit().await?;

        Ok(inserted)
    }

    async fn flush(&self) -> Result<(), StorageError> {
        // no-op for non-WAL journals
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(self.storage.get_pool())
            .await?;

        tracing::info!("point store flushed");

        Ok(())
    }
}
