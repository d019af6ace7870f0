use kerilog_api::{ProtocolError, Sensor, SensorKind, SensorType};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use time::OffsetDateTime;

use crate::errors::StorageError;
use crate::models::Table;

/// Key of the proxy circumference inside `misc`
pub const CIRCUMFERENCE_KEY: &str = "circum";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SensorRow {
    pub id: i64,
    pub node_id: i64,
    pub name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific configuration as JSON
    pub misc: String,
    pub hw_id: i64,
    pub interval: i64,
    pub last_enabled: Option<OffsetDateTime>,
}

impl SensorRow {
    /// Serializes the configuration carried by a sensor type
    pub fn misc_of(sensor_type: &SensorType) -> String {
        match sensor_type {
            SensorType::Proxy { circumference } => {
                let mut misc = Map::new();
                misc.insert(CIRCUMFERENCE_KEY.to_string(), json!(circumference));
                Value::Object(misc).to_string()
            }
            SensorType::PressureTemp | SensorType::Battery => String::from("{}"),
        }
    }

    fn circumference(&self) -> Result<f64, String> {
        let misc: Value = serde_json::from_str(&self.misc).map_err(|e| format!("misc is not JSON: {e}"))?;

        match misc.get(CIRCUMFERENCE_KEY) {
            Some(Value::Number(number)) => number
                .as_f64()
                .ok_or_else(|| format!("circumference {number} out of range")),
            Some(Value::String(text)) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("circumference {text:?} is not a number")),
            _ => Err(String::from("proxy sensor has no circumference")),
        }
    }
}

impl TryFrom<SensorRow> for Sensor {
    type Error = StorageError;

    fn try_from(row: SensorRow) -> Result<Self, Self::Error> {
        let invalid = |reason: String| StorageError::InvalidSensor { id: row.id, reason };

        let kind = row
            .kind
            .parse::<SensorKind>()
            .map_err(|e: ProtocolError| invalid(e.to_string()))?;
        let sensor_type = match kind {
            SensorKind::Proxy => SensorType::Proxy {
                circumference: row.circumference().map_err(invalid)?,
            },
            SensorKind::Pt => SensorType::PressureTemp,
            SensorKind::Bat => SensorType::Battery,
        };

        Ok(Sensor {
            id: row.id,
            node_id: row.node_id,
            name: row.name,
            hw_id: row.hw_id,
            interval: row.interval,
            sensor_type,
            last_enabled: row.last_enabled,
        })
    }
}

#[derive(Clone)]
pub struct SensorTable;

impl Table for SensorTable {
    fn name(&self) -> &'static str {
        "sensors"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS sensors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                node_id INTEGER NOT NULL,
                name TEXT NOT NULL UNIQUE,
                type TEXT NOT NULL,
                misc TEXT NOT NULL DEFAULT '{}',
                hw_id INTEGER NOT NULL,
                interval INTEGER NOT NULL,
                last_enabled TIMESTAMP,
                UNIQUE (node_id, type, hw_id),
                FOREIGN KEY (node_id) REFERENCES nodes (id) ON DELETE CASCADE
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS sensors;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["nodes"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: &str, misc: &str) -> SensorRow {
        SensorRow {
            id: 5,
            node_id: 1,
            name: String::from("wheel"),
            kind: String::from(kind),
            misc: String::from(misc),
            hw_id: 0,
            interval: 60,
            last_enabled: None,
        }
    }

    #[test]
    fn test_proxy_row_reads_circumference() {
        let sensor = Sensor::try_from(row("proxy", r#"{"circum": 250}"#)).unwrap();
        assert_eq!(sensor.sensor_type, SensorType::Proxy { circumference: 250.0 });

        let sensor = Sensor::try_from(row("proxy", r#"{"circum": "314"}"#)).unwrap();
        assert_eq!(sensor.sensor_type, SensorType::Proxy { circumference: 314.0 });
    }

    #[test]
    fn test_plain_rows_ignore_misc() {
        assert_eq!(Sensor::try_from(row("pt", "{}")).unwrap().sensor_type, SensorType::PressureTemp);
        assert_eq!(Sensor::try_from(row("bat", "")).unwrap().sensor_type, SensorType::Battery);
    }

    #[test]
    fn test_invalid_rows_are_rejected() {
        assert!(matches!(
            Sensor::try_from(row("lux", "{}")),
            Err(StorageError::InvalidSensor { id: 5, .. })
        ));
        assert!(Sensor::try_from(row("proxy", "{}")).is_err());
        assert!(Sensor::try_from(row("proxy", "not json")).is_err());
    }

    #[test]
    fn test_misc_round_trip() {
        let misc = SensorRow::misc_of(&SensorType::Proxy { circumference: 200.0 });
        let sensor = Sensor::try_from(row("proxy", &misc)).unwrap();

        assert_eq!(sensor.sensor_type, SensorType::Proxy { circumference: 200.0 });
        assert_eq!(SensorRow::misc_of(&SensorType::Battery), "{}");
    }
}
