use std::sync::Arc;

use kerilog_api::{HardwareId, Id, Sensor, SensorKind};
use sqlx::{Sqlite, Transaction};
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::errors::StorageError;
use crate::models::SensorRow;

pub struct SensorRepository {
    storage: Arc<Storage>,
}

impl SensorRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

impl SensorRepository {
    // Register a sensor on a node, returns its row id
    pub async fn create(
        &self,
        item: &Sensor,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<Id, StorageError> {
        let id = sqlx::query(
            r#"
            INSERT INTO sensors (node_id, name, type, misc, hw_id, interval, last_enabled)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(item.node_id)
        .bind(&item.name)
        .bind(item.kind().as_str())
        .bind(SensorRow::misc_of(&item.sensor_type))
        .bind(item.hw_id)
        .bind(item.interval)
        .bind(item.last_enabled)
        .execute(&mut **transaction)
        .await?
        .last_insert_rowid();

        Ok(id)
    }

    pub async fn find_by_id(&self, id: Id) -> Result<Option<Sensor>, StorageError> {
        let row: Option<SensorRow> = sqlx::query_as("SELECT * FROM sensors WHERE id = $1")
            .bind(id)
            .fetch_optional(self.storage.get_pool())
            .await?;

        row.map(Sensor::try_from).transpose()
    }

    // Look up a sensor through the hardware id of its node
    pub async fn find_by_node_hw_id_and_type(
        &self,
        node_hw_id: HardwareId,
        hw_id: HardwareId,
        kind: SensorKind,
    ) -> Result<Option<Sensor>, StorageError> {
        let row: Option<SensorRow> = sqlx::query_as(
            r#"
            SELECT s.* FROM sensors s
            INNER JOIN nodes n ON s.node_id = n.id
            WHERE n.hw_id = $1 AND s.hw_id = $2 AND s.type = $3
            "#,
        )
        .bind(node_hw_id)
        .bind(hw_id)
        .bind(kind.as_str())
        .fetch_optional(self.storage.get_pool())
        .await?;

        row.map(Sensor::try_from).transpose()
    }

    pub async fn find_by_node_hw_id(&self, node_hw_id: HardwareId) -> Result<Vec<Sensor>, StorageError> {
        let rows: Vec<SensorRow> = sqlx::query_as(
            r#"
            SELECT s.* FROM sensors s
            INNER JOIN nodes n ON s.node_id = n.id
            WHERE n.hw_id = $1
            ORDER BY s.id ASC
            "#,
        )
        .bind(node_hw_id)
        .fetch_all(self.storage.get_pool())
        .await?;

        rows.into_iter().map(Sensor::try_from).collect()
    }

    pub async fn update_last_enabled(
        &self,
        id: Id,
        time: OffsetDateTime,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<u64, StorageError> {
        let result = sqlx::query("UPDATE sensors SET last_enabled = $1 WHERE id = $2")
            .bind(time)
            .bind(id)
            .execute(&mut **transaction)
            .await?;

        Ok(result.rows_affected())
    }
}
