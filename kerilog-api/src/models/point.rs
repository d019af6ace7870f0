use core::fmt;

use alloc::string::String;

use serde::{Deserialize, Serialize};

use super::Node;

/// Series key of bridge mesh-size readings
pub const MESHSIZE_SERIES: &str = "meshsize";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for PointValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointValue::Integer(value) => write!(f, "{}", value),
            PointValue::Float(value) => write!(f, "{}", value),
            PointValue::Text(value) => f.write_str(value),
        }
    }
}

/// A single time-series sample handed to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPoint {
    pub series: String,
    /// Unix seconds
    pub timestamp: i64,
    pub value: PointValue,
}

impl TelemetryPoint {
    pub fn new(series: impl Into<String>, timestamp: i64, value: PointValue) -> Self {
        Self {
            series: series.into(),
            timestamp,
            value,
        }
    }

    pub fn meshsize(timestamp: i64, size: i64) -> Self {
        Self::new(MESHSIZE_SERIES, timestamp, PointValue::Integer(size))
    }

    pub fn lifecycle(node: &Node, timestamp: i64, event: impl Into<String>) -> Self {
        Self::new(node.lifecycle_series(), timestamp, PointValue::Text(event.into()))
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn test_value_rendering() {
        assert_eq!(PointValue::Float(12.5).to_string(), "12.5");
        assert_eq!(PointValue::Float(12.0).to_string(), "12");
        assert_eq!(PointValue::Integer(7).to_string(), "7");
        assert_eq!(PointValue::Text("init:ready".into()).to_string(), "init:ready");
    }

    #[test]
    fn test_series_keys() {
        let node = Node {
            id: 3,
            hw_id: 42,
            name: "kiln".into(),
        };

        assert_eq!(TelemetryPoint::meshsize(10, 4).series, "meshsize");
        assert_eq!(
            TelemetryPoint::lifecycle(&node, 10, "info:boot").series,
            "kiln-node"
        );
    }
}
