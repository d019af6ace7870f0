use std::sync::Arc;

use async_trait::async_trait;
use kerilog_api::{HardwareId, Id, Node, Sensor, SensorKind};
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::errors::StorageError;
use crate::repositories::{NodeRepository, SensorRepository};

/// Read access to registered nodes and sensors, plus the enabled marker
#[async_trait]
pub trait Registry: Send + Sync {
    async fn node_by_hardware_id(&self, hw_id: HardwareId) -> Result<Option<Node>, StorageError>;

    async fn sensor_by_id(&self, id: Id) -> Result<Option<Sensor>, StorageError>;

    async fn sensor_by_node_hw_id_and_type(
        &self,
        node_hw_id: HardwareId,
        hw_id: HardwareId,
        kind: SensorKind,
    ) -> Result<Option<Sensor>, StorageError>;

    async fn sensors_by_node(&self, node_hw_id: HardwareId) -> Result<Vec<Sensor>, StorageError>;

    async fn mark_sensor_enabled(&self, sensor: &Sensor, time: OffsetDateTime) -> Result<(), StorageError>;
}

pub struct SqliteRegistry {
    storage: Arc<Storage>,
    node_repository: NodeRepository,
    sensor_repository: SensorRepository,
}

impl SqliteRegistry {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            node_repository: NodeRepository::new(storage.clone()),
            sensor_repository: SensorRepository::new(storage.clone()),
            storage,
        }
    }
}

#[async_trait]
impl Registry for SqliteRegistry {
    async fn node_by_hardware_id(&self, hw_id: HardwareId) -> Result<Option<Node>, StorageError> {
        Ok(self.node_repository.find_by_hw_id(hw_id).await?)
    }

    async fn sensor_by_id(&self, id: Id) -> Result<Option<Sensor>, StorageError> {
        self.sensor_repository.find_by_id(id).await
    }

    async fn sensor_by_node_hw_id_and_type(
        &self,
        node_hw_id: HardwareId,
        hw_id: HardwareId,
        kind: SensorKind,
    ) -> Result<Option<Sensor>, StorageError> {
        self.sensor_repository
            .find_by_node_hw_id_and_type(node_hw_id, hw_id, kind)
            .await
    }

    async fn sensors_by_node(&self, node_hw_id: HardwareId) -> Result<Vec<Sensor>, StorageError> {
        self.sensor_repository.find_by_node_hw_id(node_hw_id).await
    }

    async fn mark_sensor_enabled(&self, sensor: &Sensor, time: OffsetDateTime) -> Result<(), StorageError> {
        let mut tx = self.storage.get_pool().begin().await?;
        let updated = self
            .sensor_repository
            .update_last_enabled(sensor.id, time, &mut tx)
            .await?;
        tx.commit().await?;

        if updated == 0 {
            tracing::warn!("sensor {} vanished before it could be marked enabled", sensor.id);
        } else {
            tracing::debug!("sensor {} ({}) enabled", sensor.id, sensor.name);
        }

        Ok(())
    }
}
