use core::fmt;

use alloc::string::String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Topic does not start with any subscribed root
    UnknownTopic(String),
    /// A required topic segment is absent
    MissingSegment(&'static str),
    /// Node segment is not an integer hardware id
    InvalidNodeId(String),
    /// Sensor type outside the known set
    UnknownSensorType(String),
    /// Payload does not match the grammar of its message kind
    Malformed { kind: &'static str, payload: String },
}

impl ProtocolError {
    pub(crate) fn malformed(kind: &'static str, payload: &str) -> Self {
        Self::Malformed {
            kind,
            payload: String::from(payload),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTopic(topic) => write!(f, "Unknown topic: {}", topic),
            Self::MissingSegment(segment) => write!(f, "Missing topic segment: {}", segment),
            Self::InvalidNodeId(id) => write!(f, "Invalid node id: {}", id),
            Self::UnknownSensorType(kind) => write!(f, "Unknown sensor type: {}", kind),
            Self::Malformed { kind, payload } => {
                write!(f, "Malformed {} payload: {}", kind, payload)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProtocolError {}

pub type Result<T> = core::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ProtocolError::UnknownSensorType("lux".into()).to_string(),
            "Unknown sensor type: lux"
        );
        assert_eq!(
            ProtocolError::malformed("data", "5:abc:1").to_string(),
            "Malformed data payload: 5:abc:1"
        );
        assert_eq!(
            ProtocolError::MissingSegment("kind").to_string(),
            "Missing topic segment: kind"
        );
    }
}
