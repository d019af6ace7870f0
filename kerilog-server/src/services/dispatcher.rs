use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use kerilog_api::command::{outbound_topic, OutboundCommand};
use kerilog_api::payload::{is_ready, parse_meshsize};
use kerilog_api::topic::{Envelope, MessageKind, Origin, TopicParser};
use kerilog_api::{Node, ProtocolError, TelemetryPoint};
use time::OffsetDateTime;
use tokio::task::JoinHandle;

use crate::configs::Topics;
use crate::errors::DispatchError;
use crate::services::{
    HandshakeOutcome, HandshakePlan, HandshakeSequencer, PointStore, Publisher, Registry, StatusTracker,
    TelemetryDecoder,
};

const NODE_AUDIT: &str = "kerilog_server::audit::node";
const BRIDGE_AUDIT: &str = "kerilog_server::audit::bridge";

#[derive(Debug)]
pub enum DispatchOutcome {
    Handled,
    /// Logged and discarded
    Dropped,
    /// A handshake was started and keeps running in the background
    Handshake(JoinHandle<HandshakeOutcome>),
}

/// Routes one inbound message to its handler. Never fails: every error is
/// logged here and the message is dropped.
pub struct Dispatcher {
    parser: TopicParser,
    outbound_prefix: String,
    registry: Arc<dyn Registry>,
    store: Arc<dyn PointStore>,
    publisher: Arc<dyn Publisher>,
    telemetry: TelemetryDecoder,
    status: StatusTracker,
    sequencer: HandshakeSequencer,
}

impl Dispatcher {
    pub fn new(
        topics: &Topics,
        pacing: Duration,
        registry: Arc<dyn Registry>,
        store: Arc<dyn PointStore>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            parser: TopicParser::new(&topics.bridge, &topics.node),
            outbound_prefix: topics.outbound.clone(),
            telemetry: TelemetryDecoder::new(registry.clone()),
            status: StatusTracker::new(registry.clone()),
            sequencer: HandshakeSequencer::new(publisher.clone(), registry.clone(), pacing),
            registry,
            store,
            publisher,
        }
    }

    pub async fn dispatch(&self, topic: &str, payload: &str) -> DispatchOutcome {
        match AssertUnwindSafe(self.route(topic, payload)).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                if e.is_rejection() {
                    tracing::warn!("dropped {} {:?}: {}", topic, payload, e);
                } else {
                    tracing::error!(error = ?e, "failed to handle {} {:?}: {}", topic, payload, e);
                }
                DispatchOutcome::Dropped
            }
            Err(panic) => {
                tracing::error!("handler panicked on {} {:?}: {}", topic, payload, panic_message(panic.as_ref()));
                DispatchOutcome::Dropped
            }
        }
    }

    /// Cancels handshakes still in flight, called once on shutdown
    pub fn abort_handshakes(&self) -> usize {
        self.sequencer.abort_all()
    }

    async fn route(&self, topic: &str, payload: &str) -> Result<DispatchOutcome, DispatchError> {
        let envelope = self.parser.parse(topic, payload)?;

        match envelope.origin {
            Origin::Bridge => self.handle_bridge(&envelope).await,
            Origin::Node => self.handle_node(&envelope).await,
        }
    }

    async fn handle_bridge(&self, envelope: &Envelope) -> Result<DispatchOutcome, DispatchError> {
        tracing::info!(target: BRIDGE_AUDIT, "{} {}", envelope.topic(), envelope.payload);

        if envelope.kind != MessageKind::MeshSize {
            return Ok(DispatchOutcome::Dropped);
        }

        let size = parse_meshsize(&envelope.payload)?;
        self.store
            .append_points(&[TelemetryPoint::meshsize(unix_now(), size)])
            .await?;

        Ok(DispatchOutcome::Handled)
    }

    async fn handle_node(&self, envelope: &Envelope) -> Result<DispatchOutcome, DispatchError> {
        let hw_id = envelope.node_hw_id.ok_or(ProtocolError::MissingSegment("node id"))?;

        // data is too frequent to echo
        if envelope.kind != MessageKind::Data {
            tracing::info!(target: NODE_AUDIT, "{} {}", envelope.topic(), envelope.payload);
        }

        let node = self
            .registry
            .node_by_hardware_id(hw_id)
            .await?
            .ok_or(DispatchError::UnknownNode(hw_id))?;

        let outcome = match &envelope.kind {
            MessageKind::Init if is_ready(&envelope.payload) => {
                DispatchOutcome::Handshake(self.start_handshake(&node).await?)
            }
            MessageKind::Init | MessageKind::Error | MessageKind::Info => DispatchOutcome::Handled,
            MessageKind::Ack => {
                self.status.handle_ack(&node, &envelope.payload).await?;
                DispatchOutcome::Handled
            }
            MessageKind::Status => {
                self.status.handle_status(&node, &envelope.payload).await?;
                DispatchOutcome::Handled
            }
            MessageKind::Data => {
                self.handle_data(&node, &envelope.payload).await?;
                DispatchOutcome::Handled
            }
            MessageKind::MeshSize | MessageKind::Unknown(_) => {
                tracing::warn!("unknown message kind {:?} from node {}", envelope.kind, hw_id);
                return Ok(DispatchOutcome::Dropped);
            }
        };

        if envelope.kind.is_lifecycle() {
            let point = TelemetryPoint::lifecycle(&node, unix_now(), envelope.lifecycle_value());
            self.store.append_points(&[point]).await?;
        }

        Ok(outcome)
    }

    async fn handle_data(&self, node: &Node, payload: &str) -> Result<(), DispatchError> {
        let points = self.telemetry.decode(node, payload).await?;
        let inserted = self.store.append_points(&points).await?;
        tracing::debug!("node {} stored {}/{} points", node.hw_id, inserted, points.len());

        let ack = OutboundCommand::DataAck(payload.to_string());
        self.publisher
            .publish(&outbound_topic(&self.outbound_prefix, node.hw_id), &ack.to_string())
            .await?;

        Ok(())
    }

    async fn start_handshake(&self, node: &Node) -> Result<JoinHandle<HandshakeOutcome>, DispatchError> {
        let sensors = self.registry.sensors_by_node(node.hw_id).await?;
        tracing::info!("node {} ready, configuring {} sensors", node.hw_id, sensors.len());

        let plan = HandshakePlan::new(&self.outbound_prefix, node, sensors, OffsetDateTime::now_utc());

        Ok(self.sequencer.start(plan))
    }
}

fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
