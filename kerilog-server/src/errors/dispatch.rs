use kerilog_api::{HardwareId, ProtocolError, SensorKind};

use crate::errors::{PublishError, StorageError};

/// Why a single inbound message was dropped
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Unknown node {0}")]
    UnknownNode(HardwareId),

    #[error("Unknown sensor id {0}")]
    UnknownSensor(i64),

    #[error("Unknown {kind} sensor {hw_id} on node {node}")]
    UnknownNodeSensor {
        node: HardwareId,
        kind: SensorKind,
        hw_id: HardwareId,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl DispatchError {
    /// Failures caused by the message itself rather than the gateway
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            DispatchError::UnknownNode(_)
                | DispatchError::UnknownSensor(_)
                | DispatchError::UnknownNodeSensor { .. }
                | DispatchError::Protocol(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections() {
        assert!(DispatchError::UnknownNode(42).is_rejection());
        assert!(DispatchError::Protocol(ProtocolError::MissingSegment("kind")).is_rejection());
        assert!(!DispatchError::Publish(PublishError::Rejected("offline".into())).is_rejection());
    }

    #[test]
    fn test_display() {
        let error = DispatchError::UnknownNodeSensor {
            node: 42,
            kind: SensorKind::Proxy,
            hw_id: 3,
        };

        assert_eq!(error.to_string(), "Unknown proxy sensor 3 on node 42");
    }
}
