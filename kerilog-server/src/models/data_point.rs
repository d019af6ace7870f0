use kerilog_api::TelemetryPoint;
use serde::{Deserialize, Serialize};

use crate::models::Table;

/// A stored time-series sample; `(series, time)` is unique
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DataPoint {
    pub series: String,
    /// Unix seconds
    pub time: i64,
    pub value: String,
}

impl From<&TelemetryPoint> for DataPoint {
    fn from(point: &TelemetryPoint) -> Self {
        DataPoint {
            series: point.series.clone(),
            time: point.timestamp,
            value: point.value.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct DataPointTable;

impl Table for DataPointTable {
    fn name(&self) -> &'static str {
        "data_points"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS data_points (
                series TEXT NOT NULL,
                time INTEGER NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (series, time)
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS data_points;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}
