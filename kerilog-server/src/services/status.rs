use std::sync::Arc;

use kerilog_api::payload::{AckPayload, StatusPayload};
use kerilog_api::{HardwareId, Node, Sensor, SensorKind};
use time::OffsetDateTime;

use crate::errors::DispatchError;
use crate::services::Registry;

/// Marks sensors enabled from `status` reports and `ack` replies
pub struct StatusTracker {
    registry: Arc<dyn Registry>,
}

impl StatusTracker {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self { registry }
    }

    /// Returns how many sensors were marked
    pub async fn handle_status(&self, node: &Node, payload: &str) -> Result<usize, DispatchError> {
        let status: StatusPayload = payload.parse()?;

        let mut sensors = Vec::with_capacity(status.hw_ids.len());
        for hw_id in status.hw_ids {
            sensors.push(self.resolve(node, hw_id, status.kind).await?);
        }

        let now = OffsetDateTime::now_utc();
        for sensor in &sensors {
            self.registry.mark_sensor_enabled(sensor, now).await?;
        }

        Ok(sensors.len())
    }

    pub async fn handle_ack(&self, node: &Node, payload: &str) -> Result<(), DispatchError> {
        match payload.parse::<AckPayload>()? {
            AckPayload::Enable { kind, hw_id } => {
                let sensor = self.resolve(node, hw_id, kind).await?;
                self.registry
                    .mark_sensor_enabled(&sensor, OffsetDateTime::now_utc())
                    .await?;
            }
            AckPayload::Unrecognized(other) => {
                tracing::warn!("unrecognized ack from node {}: {}", node.hw_id, other);
            }
        }

        Ok(())
    }

    async fn resolve(&self, node: &Node, hw_id: HardwareId, kind: SensorKind) -> Result<Sensor, DispatchError> {
        self.registry
            .sensor_by_node_hw_id_and_type(node.hw_id, hw_id, kind)
            .await?
            .ok_or(DispatchError::UnknownNodeSensor {
                node: node.hw_id,
                kind,
                hw_id,
            })
    }
}
