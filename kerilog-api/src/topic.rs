//! Topic classification for bridge and node traffic.
//!
//! Node topics look like `fromNode/<hw_id>/<kind>[/<more>...]`, bridge topics
//! like `fromBridge/<name>`. Both roots are configurable subscription filters.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};
use crate::models::HardwareId;

pub const DEFAULT_BRIDGE_FILTER: &str = "fromBridge/#";
pub const DEFAULT_NODE_FILTER: &str = "fromNode/#";

/// The only bridge topic that carries data
pub const MESHSIZE_TOPIC: &str = "meshsize";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    Bridge,
    Node,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Init,
    Ack,
    Status,
    Data,
    Error,
    Info,
    MeshSize,
    Unknown(String),
}

impl MessageKind {
    fn from_node_segment(segment: &str) -> Self {
        match segment {
            "init" => MessageKind::Init,
            "ack" => MessageKind::Ack,
            "status" => MessageKind::Status,
            "data" => MessageKind::Data,
            "error" => MessageKind::Error,
            "info" => MessageKind::Info,
            other => MessageKind::Unknown(other.to_string()),
        }
    }

    fn from_bridge_topic(topic: &str) -> Self {
        if topic == MESHSIZE_TOPIC {
            MessageKind::MeshSize
        } else {
            MessageKind::Unknown(topic.to_string())
        }
    }

    /// Kinds mirrored into the node's event timeline
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            MessageKind::Error | MessageKind::Info | MessageKind::Status | MessageKind::Init
        )
    }
}

/// Typed view of one inbound transport message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub origin: Origin,
    /// Present for node-origin messages only
    pub node_hw_id: Option<HardwareId>,
    pub kind: MessageKind,
    /// Topic segments after the root, lower-cased
    pub segments: Vec<String>,
    /// Payload with trailing whitespace removed, lower-cased
    pub payload: String,
}

impl Envelope {
    /// Topic with the root stripped
    pub fn topic(&self) -> String {
        self.segments.join("/")
    }

    /// Kind plus trailing segments, e.g. `error-flash`
    pub fn event(&self) -> String {
        match self.origin {
            Origin::Node => self.segments.iter().skip(1).cloned().collect::<Vec<_>>().join("-"),
            Origin::Bridge => self.segments.join("-"),
        }
    }

    /// Event line recorded on the node timeline
    pub fn lifecycle_value(&self) -> String {
        let mut value = self.event();
        value.push(':');
        value.push_str(&self.payload);
        value
    }
}

#[derive(Debug, Clone)]
pub struct TopicParser {
    bridge_root: String,
    node_root: String,
}

impl TopicParser {
    /// Builds a parser from the two subscription filters, e.g. `fromNode/#`
    pub fn new(bridge_filter: &str, node_filter: &str) -> Self {
        Self {
            bridge_root: Self::root_of(bridge_filter),
            node_root: Self::root_of(node_filter),
        }
    }

    fn root_of(filter: &str) -> String {
        let root = filter.trim_end_matches('#');
        if root.ends_with('/') {
            root.to_string()
        } else {
            let mut root = root.to_string();
            root.push('/');
            root
        }
    }

    pub fn parse(&self, topic: &str, payload: &str) -> Result<Envelope> {
        let payload = payload.trim_end().to_lowercase();

        if let Some(rest) = topic.strip_prefix(self.node_root.as_str()) {
            let segments = Self::segments(rest);
            let hw_id = segments
                .first()
                .map(|segment| segment.trim())
                .filter(|segment| !segment.is_empty())
                .ok_or(ProtocolError::MissingSegment("node id"))?;
            let node_hw_id = hw_id
                .parse::<HardwareId>()
                .map_err(|_| ProtocolError::InvalidNodeId(hw_id.to_string()))?;
            let kind = segments
                .get(1)
                .map(|segment| MessageKind::from_node_segment(segment))
                .ok_or(ProtocolError::MissingSegment("kind"))?;

            return Ok(Envelope {
                origin: Origin::Node,
                node_hw_id: Some(node_hw_id),
                kind,
                segments,
                payload,
            });
        }

        if let Some(rest) = topic.strip_prefix(self.bridge_root.as_str()) {
            let segments = Self::segments(rest);
            let kind = MessageKind::from_bridge_topic(&segments.join("/"));

            return Ok(Envelope {
                origin: Origin::Bridge,
                node_hw_id: None,
                kind,
                segments,
                payload,
            });
        }

        Err(ProtocolError::UnknownTopic(topic.to_string()))
    }

    fn segments(rest: &str) -> Vec<String> {
        rest.trim()
            .to_lowercase()
            .split('/')
            .map(|segment| segment.to_string())
            .collect()
    }
}

impl Default for TopicParser {
    fn default() -> Self {
        Self::new(DEFAULT_BRIDGE_FILTER, DEFAULT_NODE_FILTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_node_data() {
        let envelope = TopicParser::default()
            .parse("fromNode/42/data", "5:12.5:1600000000\n")
            .unwrap();

        assert_eq!(envelope.origin, Origin::Node);
        assert_eq!(envelope.node_hw_id, Some(42));
        assert_eq!(envelope.kind, MessageKind::Data);
        assert_eq!(envelope.payload, "5:12.5:1600000000");
        assert_eq!(envelope.topic(), "42/data");
    }

    #[test]
    fn test_parse_lowercases_remainder() {
        let envelope = TopicParser::default()
            .parse("fromNode/7/STATUS ", "PROXY:[0,1]")
            .unwrap();

        assert_eq!(envelope.kind, MessageKind::Status);
        assert_eq!(envelope.payload, "proxy:[0,1]");
        assert_eq!(envelope.lifecycle_value(), "status:proxy:[0,1]");
    }

    #[test]
    fn test_lifecycle_value_joins_trailing_segments() {
        let envelope = TopicParser::default()
            .parse("fromNode/7/error/flash", "bad block")
            .unwrap();

        assert_eq!(envelope.kind, MessageKind::Error);
        assert_eq!(envelope.lifecycle_value(), "error-flash:bad block");
    }

    #[test]
    fn test_parse_node_id_with_padding() {
        let envelope = TopicParser::default()
            .parse("fromNode/ 42 /info", "up")
            .unwrap();

        assert_eq!(envelope.node_hw_id, Some(42));
        assert_eq!(envelope.kind, MessageKind::Info);
        assert_eq!(
            TopicParser::default().parse("fromNode/ /info", "up"),
            Err(ProtocolError::MissingSegment("node id"))
        );
    }

    #[test]
    fn test_parse_unrecognized_kind() {
        let envelope = TopicParser::default()
            .parse("fromNode/7/reboot", "")
            .unwrap();

        assert_eq!(envelope.kind, MessageKind::Unknown("reboot".into()));
    }

    #[test]
    fn test_parse_bridge_meshsize() {
        let envelope = TopicParser::default()
            .parse("fromBridge/meshsize", "12")
            .unwrap();

        assert_eq!(envelope.origin, Origin::Bridge);
        assert_eq!(envelope.node_hw_id, None);
        assert_eq!(envelope.kind, MessageKind::MeshSize);

        let other = TopicParser::default()
            .parse("fromBridge/log", "hello")
            .unwrap();
        assert_eq!(other.kind, MessageKind::Unknown("log".into()));
    }

    #[test]
    fn test_parse_rejects_bad_topics() {
        let parser = TopicParser::default();

        assert_eq!(
            parser.parse("toBridge/42", "x"),
            Err(ProtocolError::UnknownTopic("toBridge/42".into()))
        );
        assert_eq!(
            parser.parse("fromNode/abc/data", "x"),
            Err(ProtocolError::InvalidNodeId("abc".into()))
        );
        assert_eq!(
            parser.parse("fromNode/42", "x"),
            Err(ProtocolError::MissingSegment("kind"))
        );
        assert_eq!(
            parser.parse("fromNode/", "x"),
            Err(ProtocolError::MissingSegment("node id"))
        );
    }

    #[test]
    fn test_custom_roots() {
        let parser = TopicParser::new("site/bridge/#", "site/node");
        let envelope = parser.parse("site/node/3/info", "up").unwrap();

        assert_eq!(envelope.node_hw_id, Some(3));
        assert_eq!(envelope.kind, MessageKind::Info);
    }
}
