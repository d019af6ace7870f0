use std::sync::Arc;

use kerilog_api::payload::DataPayload;
use kerilog_api::{Node, PointValue, TelemetryPoint};

use crate::errors::DispatchError;
use crate::services::Registry;

/// Turns `data` payloads into points keyed by sensor name
pub struct TelemetryDecoder {
    registry: Arc<dyn Registry>,
}

impl TelemetryDecoder {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self { registry }
    }

    /// Resolves every entry before returning, so one bad entry rejects the
    /// whole payload.
    pub async fn decode(&self, node: &Node, payload: &str) -> Result<Vec<TelemetryPoint>, DispatchError> {
        let data: DataPayload = payload.parse()?;
        let timestamp = data.timestamp();

        let mut points = Vec::new();
        for entry in data.entries() {
            let sensor = self
                .registry
                .sensor_by_id(entry.sensor_id)
                .await?
                .ok_or(DispatchError::UnknownSensor(entry.sensor_id))?;

            if sensor.node_id != node.id {
                tracing::debug!("sensor {} reported through node {}", sensor.id, node.hw_id);
            }

            points.push(TelemetryPoint::new(
                sensor.name.clone(),
                timestamp,
                PointValue::Float(sensor.normalize(entry.value)),
            ));
        }

        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use kerilog_api::{Sensor, SensorType};

    use crate::services::mock::MemoryRegistry;

    use super::*;

    fn node() -> Node {
        Node {
            id: 1,
            hw_id: 42,
            name: String::from("garden"),
        }
    }

    fn decoder() -> TelemetryDecoder {
        let sensor = |id: i64, name: &str, sensor_type: SensorType| Sensor {
            id,
            node_id: 1,
            name: name.to_string(),
            hw_id: id,
            interval: 60,
            sensor_type,
            last_enabled: None,
        };

        let registry = MemoryRegistry::new()
            .with_node(node())
            .with_sensor(sensor(3, "wheel", SensorType::Proxy { circumference: 200.0 }))
            .with_sensor(sensor(5, "probe", SensorType::PressureTemp))
            .with_sensor(sensor(7, "battery", SensorType::Battery));

        TelemetryDecoder::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_v1_plain_value() {
        let points = decoder().decode(&node(), "5:12.5:1600000000").await.unwrap();

        assert_eq!(points, vec![TelemetryPoint::new("probe", 1600000000, PointValue::Float(12.5))]);
    }

    #[tokio::test]
    async fn test_v1_proxy_is_scaled() {
        let points = decoder().decode(&node(), "3:10:1600000000").await.unwrap();

        assert_eq!(points[0].series, "wheel");
        assert_eq!(points[0].value, PointValue::Float(2.0));
    }

    #[tokio::test]
    async fn test_v2_shares_timestamp() {
        let points = decoder()
            .decode(&node(), "v2:1600000000:3,5;5,21.5;7,3.7;")
            .await
            .unwrap();

        assert_eq!(points.len(), 3);
        assert!(points.iter().all(|point| point.timestamp == 1600000000));
        assert_eq!(points[0].value, PointValue::Float(1.0));
        assert_eq!(points[2].series, "battery");
    }

    #[tokio::test]
    async fn test_unknown_sensor_rejects_batch() {
        let result = decoder().decode(&node(), "v2:1600000000:5,21.5;99,1;").await;

        assert!(matches!(result, Err(DispatchError::UnknownSensor(99))));
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let result = decoder().decode(&node(), "5:12.5").await;

        assert!(matches!(result, Err(DispatchError::Protocol(_))));
    }
}
