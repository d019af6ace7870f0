//! Outbound commands published to a node through the bridge.

use core::fmt;

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use crate::models::{HardwareId, Id, Sensor, SensorKind};

pub const DEFAULT_OUTBOUND_PREFIX: &str = "toBridge";

/// Literal that moves a node into its configured state
pub const CONFIG_COMMAND: &str = "[config]";

const DATA_ACK_PREFIX: &str = "ackd:";

/// Topic that reaches the node with the given hardware id
pub fn outbound_topic(prefix: &str, node_hw_id: HardwareId) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), node_hw_id)
}

/// "Enable sensor X with interval Y", rendered as `hw_id,interval,sensor_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnableCommand {
    pub hw_id: HardwareId,
    pub interval: i64,
    pub sensor_id: Id,
}

impl From<&Sensor> for EnableCommand {
    fn from(sensor: &Sensor) -> Self {
        Self {
            hw_id: sensor.hw_id,
            interval: sensor.interval,
            sensor_id: sensor.id,
        }
    }
}

impl fmt::Display for EnableCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.hw_id, self.interval, self.sensor_id)
    }
}

/// All enable commands of one sensor type, sent as a single message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnableBatch {
    pub kind: SensorKind,
    pub commands: Vec<EnableCommand>,
}

impl EnableBatch {
    pub fn sensor_ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.commands.iter().map(|command| command.sensor_id)
    }
}

impl fmt::Display for EnableBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let descriptors = self
            .commands
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";");

        write!(f, "[enable:{}:{}]", self.kind, descriptors)
    }
}

/// Groups the sensors of a node by type, skipping types without sensors.
///
/// Batches follow [`SensorKind::ALL`], sensors keep their input order.
pub fn build_enable_batches(sensors: &[Sensor]) -> Vec<EnableBatch> {
    SensorKind::ALL
        .iter()
        .filter_map(|kind| {
            let commands: Vec<EnableCommand> = sensors
                .iter()
                .filter(|sensor| sensor.kind() == *kind)
                .map(EnableCommand::from)
                .collect();

            (!commands.is_empty()).then(|| EnableBatch {
                kind: *kind,
                commands,
            })
        })
        .collect()
}

pub fn build_enable_commands(sensors: &[Sensor]) -> Vec<String> {
    build_enable_batches(sensors)
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundCommand {
    /// Pushes the wall clock to the node, always in UTC
    SetTime(OffsetDateTime),
    Enable(EnableBatch),
    Config,
    /// Confirms a data payload was persisted
    DataAck(String),
}

impl fmt::Display for OutboundCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutboundCommand::SetTime(time) => {
                let utc = time.to_offset(UtcOffset::UTC);
                write!(
                    f,
                    "[settime:{}:{}:{}:{}:{}:{}]",
                    utc.year(),
                    u8::from(utc.month()),
                    utc.day(),
                    utc.hour(),
                    utc.minute(),
                    utc.second()
                )
            }
            OutboundCommand::Enable(batch) => write!(f, "{}", batch),
            OutboundCommand::Config => f.write_str(CONFIG_COMMAND),
            OutboundCommand::DataAck(payload) => write!(f, "{}{}", DATA_ACK_PREFIX, payload),
        }
    }
}
