use core::fmt;
use core::str::FromStr;

use alloc::string::String;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{HardwareId, Id};
use crate::error::ProtocolError;

/// Wire-level sensor category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    /// Rotation or pulse counter
    Proxy,
    /// Temperature probe
    Pt,
    /// Battery level
    Bat,
}

impl SensorKind {
    /// Every kind, in the order enable commands are emitted
    pub const ALL: [SensorKind; 3] = [SensorKind::Proxy, SensorKind::Pt, SensorKind::Bat];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Proxy => "proxy",
            SensorKind::Pt => "pt",
            SensorKind::Bat => "bat",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "proxy" => Ok(SensorKind::Proxy),
            "pt" => Ok(SensorKind::Pt),
            "bat" => Ok(SensorKind::Bat),
            other => Err(ProtocolError::UnknownSensorType(String::from(other))),
        }
    }
}

/// Sensor category together with its type-specific configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SensorType {
    Proxy { circumference: f64 },
    PressureTemp,
    Battery,
}

impl SensorType {
    pub fn kind(&self) -> SensorKind {
        match self {
            SensorType::Proxy { .. } => SensorKind::Proxy,
            SensorType::PressureTemp => SensorKind::Pt,
            SensorType::Battery => SensorKind::Bat,
        }
    }

    /// Converts a raw reading into the unit stored for this sensor.
    ///
    /// Proxy sensors report rotation counts which are scaled by the wheel
    /// circumference; every other type is stored as reported.
    pub fn normalize(&self, raw: f64) -> f64 {
        match self {
            SensorType::Proxy { circumference } => raw * circumference / 1000.0,
            SensorType::PressureTemp | SensorType::Battery => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    /// Registry identifier, also carried in telemetry payloads
    pub id: Id,
    /// Owning node registry identifier
    pub node_id: Id,
    /// Display name, used as the series key
    pub name: String,
    /// Index of the sensor on its node, unique per type
    pub hw_id: HardwareId,
    /// Sampling interval in seconds
    pub interval: i64,
    pub sensor_type: SensorType,
    pub last_enabled: Option<OffsetDateTime>,
}

impl Sensor {
    pub fn kind(&self) -> SensorKind {
        self.sensor_type.kind()
    }

    pub fn normalize(&self, raw: f64) -> f64 {
        self.sensor_type.normalize(raw)
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!("proxy".parse::<SensorKind>(), Ok(SensorKind::Proxy));
        assert_eq!(" bat".parse::<SensorKind>(), Ok(SensorKind::Bat));
        assert_eq!(
            "lux".parse::<SensorKind>(),
            Err(ProtocolError::UnknownSensorType("lux".into()))
        );
        assert_eq!(SensorKind::Pt.to_string(), "pt");
    }

    #[test]
    fn test_proxy_normalization() {
        let proxy = SensorType::Proxy {
            circumference: 250.0,
        };

        assert_eq!(proxy.normalize(8.0), 2.0);
        assert_eq!(proxy.kind(), SensorKind::Proxy);
    }

    #[test]
    fn test_other_types_unchanged() {
        assert_eq!(SensorType::PressureTemp.normalize(12.5), 12.5);
        assert_eq!(SensorType::Battery.normalize(3.7), 3.7);
    }

    #[test]
    fn test_sensor_type_serde() {
        let json = serde_json::to_string(&SensorType::Proxy {
            circumference: 200.0,
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"proxy","circumference":200.0}"#);

        let parsed: SensorType = serde_json::from_str(r#"{"type":"battery"}"#).unwrap();
        assert_eq!(parsed, SensorType::Battery);
    }
}
