//! Grammar of inbound node payloads.
//!
//! | kind   | grammar                                      |
//! |--------|----------------------------------------------|
//! | init   | `ready...`                                   |
//! | ack    | `enable:<type>/<num>`                        |
//! | status | `<type>:[h,...][h,...]...`                   |
//! | data   | `<sensor_id>:<value>:<timestamp>`            |
//! | data   | `v2:<timestamp>:<id>,<value>;<id>,<value>;`  |

use core::str::FromStr;

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};
use crate::models::{HardwareId, Id, SensorKind};

const V2_PREFIX: &str = "v2";

/// An `init` payload starting with this marker triggers the handshake
pub const READY_MARKER: &str = "ready";

pub fn is_ready(payload: &str) -> bool {
    payload.starts_with(READY_MARKER)
}

pub fn parse_meshsize(payload: &str) -> Result<i64> {
    payload
        .trim()
        .parse::<i64>()
        .map_err(|_| ProtocolError::malformed("meshsize", payload))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataEntry {
    pub sensor_id: Id,
    /// Raw reading before unit normalization
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataPayload {
    /// A single reading
    V1 { entry: DataEntry, timestamp: i64 },
    /// A batch of readings sharing one timestamp
    V2 { timestamp: i64, entries: Vec<DataEntry> },
}

impl DataPayload {
    pub fn timestamp(&self) -> i64 {
        match self {
            DataPayload::V1 { timestamp, .. } | DataPayload::V2 { timestamp, .. } => *timestamp,
        }
    }

    pub fn entries(&self) -> Vec<DataEntry> {
        match self {
            DataPayload::V1 { entry, .. } => vec![*entry],
            DataPayload::V2 { entries, .. } => entries.clone(),
        }
    }

    fn parse_v1(payload: &str) -> Result<Self> {
        let malformed = || ProtocolError::malformed("data", payload);

        let fields: Vec<&str> = payload.split(':').collect();
        let &[id, value, timestamp] = fields.as_slice() else {
            return Err(malformed());
        };

        Ok(DataPayload::V1 {
            entry: DataEntry {
                sensor_id: parse_number(id).ok_or_else(malformed)?,
                value: parse_number(value).ok_or_else(malformed)?,
            },
            timestamp: parse_number(timestamp).ok_or_else(malformed)?,
        })
    }

    fn parse_v2(payload: &str) -> Result<Self> {
        let malformed = || ProtocolError::malformed("data v2", payload);

        let fields: Vec<&str> = payload.split(':').collect();
        let &[V2_PREFIX, timestamp, batch] = fields.as_slice() else {
            return Err(malformed());
        };
        let timestamp = parse_number(timestamp).ok_or_else(malformed)?;

        let mut items: Vec<&str> = batch.split(';').collect();
        // the trailing separator leaves one empty element behind
        if items.last().is_some_and(|item| item.trim().is_empty()) {
            items.pop();
        }

        let entries = items
            .into_iter()
            .map(|item| {
                let (id, value) = item.split_once(',').ok_or_else(malformed)?;
                Ok(DataEntry {
                    sensor_id: parse_number(id).ok_or_else(malformed)?,
                    value: parse_number(value).ok_or_else(malformed)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(DataPayload::V2 { timestamp, entries })
    }
}

impl FromStr for DataPayload {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        if s.starts_with(V2_PREFIX) {
            Self::parse_v2(s)
        } else {
            Self::parse_v1(s)
        }
    }
}

/// Sensors a node reports as running, one bracket group per sensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub kind: SensorKind,
    pub hw_ids: Vec<HardwareId>,
}

impl FromStr for StatusPayload {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || ProtocolError::malformed("status", s);

        let (kind, list) = s.split_once(':').ok_or_else(malformed)?;
        let kind = kind.parse::<SensorKind>()?;

        let mut groups = list.trim().split('[');
        if !groups.next().unwrap_or_default().trim().is_empty() {
            return Err(malformed());
        }

        let mut hw_ids = Vec::new();
        for group in groups {
            let (body, _) = group.split_once(']').ok_or_else(malformed)?;
            let first = body.split(',').next().unwrap_or_default().trim();
            if first.is_empty() {
                continue;
            }
            hw_ids.push(parse_number(first).ok_or_else(malformed)?);
        }

        Ok(StatusPayload { kind, hw_ids })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AckPayload {
    /// The node confirmed a sensor is enabled
    Enable { kind: SensorKind, hw_id: HardwareId },
    /// Any other acknowledgement, kept verbatim
    Unrecognized(String),
}

impl FromStr for AckPayload {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some(("enable", target)) => {
                let (kind, num) = target
                    .split_once('/')
                    .ok_or_else(|| ProtocolError::malformed("ack", s))?;

                Ok(AckPayload::Enable {
                    kind: kind.parse()?,
                    hw_id: parse_number(num).ok_or_else(|| ProtocolError::malformed("ack", s))?,
                })
            }
            _ => Ok(AckPayload::Unrecognized(String::from(s))),
        }
    }
}

fn parse_number<T: FromStr>(field: &str) -> Option<T> {
    field.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_v1() {
        let data: DataPayload = "5:12.5:1600000000".parse().unwrap();

        assert_eq!(
            data,
            DataPayload::V1 {
                entry: DataEntry {
                    sensor_id: 5,
                    value: 12.5
                },
                timestamp: 1600000000,
            }
        );
        assert_eq!(data.entries().len(), 1);
    }

    #[test]
    fn test_parse_v1_rejects_bad_fields() {
        assert!("5:12.5".parse::<DataPayload>().is_err());
        assert!("5:abc:1600000000".parse::<DataPayload>().is_err());
        assert!("5:1:2:3".parse::<DataPayload>().is_err());
        assert!("x:1:2".parse::<DataPayload>().is_err());
    }

    #[test]
    fn test_parse_v2_discards_trailing_element() {
        let data: DataPayload = "v2:1600000000:5,10;6,2.5;".parse().unwrap();

        assert_eq!(data.timestamp(), 1600000000);
        assert_eq!(
            data.entries(),
            vec![
                DataEntry {
                    sensor_id: 5,
                    value: 10.0
                },
                DataEntry {
                    sensor_id: 6,
                    value: 2.5
                },
            ]
        );
    }

    #[test]
    fn test_parse_v2_without_trailing_separator() {
        let data: DataPayload = "v2:100:5,10".parse().unwrap();
        assert_eq!(data.entries().len(), 1);

        let empty: DataPayload = "v2:100:".parse().unwrap();
        assert!(empty.entries().is_empty());
    }

    #[test]
    fn test_parse_v2_rejects_bad_entries() {
        assert!("v2:100:5;".parse::<DataPayload>().is_err());
        assert!("v2:100:5,1;;6,2;".parse::<DataPayload>().is_err());
        assert!("v2:abc:5,1;".parse::<DataPayload>().is_err());
        assert!("v2:100".parse::<DataPayload>().is_err());
    }

    #[test]
    fn test_parse_status() {
        let status: StatusPayload = "proxy:[0,x][1,y]".parse().unwrap();

        assert_eq!(status.kind, SensorKind::Proxy);
        assert_eq!(status.hw_ids, vec![0, 1]);
    }

    #[test]
    fn test_parse_status_edge_cases() {
        let empty: StatusPayload = "pt:".parse().unwrap();
        assert!(empty.hw_ids.is_empty());

        let single: StatusPayload = "bat:[3]".parse().unwrap();
        assert_eq!(single.hw_ids, vec![3]);

        assert_eq!(
            "lux:[0,1]".parse::<StatusPayload>(),
            Err(ProtocolError::UnknownSensorType("lux".into()))
        );
        assert!("proxy:[a,1]".parse::<StatusPayload>().is_err());
        assert!("proxy:[0,1".parse::<StatusPayload>().is_err());
        assert!("proxy".parse::<StatusPayload>().is_err());
    }

    #[test]
    fn test_parse_ack() {
        assert_eq!(
            "enable:pt/2".parse::<AckPayload>(),
            Ok(AckPayload::Enable {
                kind: SensorKind::Pt,
                hw_id: 2
            })
        );
        assert_eq!(
            "config:ok".parse::<AckPayload>(),
            Ok(AckPayload::Unrecognized("config:ok".into()))
        );
        assert!("enable:pt".parse::<AckPayload>().is_err());
        assert!("enable:lux/1".parse::<AckPayload>().is_err());
    }

    #[test]
    fn test_ready_and_meshsize() {
        assert!(is_ready("ready"));
        assert!(is_ready("ready:fw=1.2"));
        assert!(!is_ready("booting"));

        assert_eq!(parse_meshsize("12"), Ok(12));
        assert!(parse_meshsize("twelve").is_err());
    }
}
