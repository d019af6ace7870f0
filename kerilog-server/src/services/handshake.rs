//! Per-node handshake: `settime`, one `enable` per sensor type, then `config`.
//!
//! Nodes have no inbound queue, so consecutive publishes are spaced by a
//! pacing delay. The sequence runs as a timer-driven task and never blocks the
//! dispatcher. A newer `init:ready` from the same node supersedes a running
//! handshake before its next publish.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use kerilog_api::command::{build_enable_batches, outbound_topic, EnableBatch, OutboundCommand};
use kerilog_api::{HardwareId, Node, Sensor};
use time::OffsetDateTime;
use tokio::task::{AbortHandle, JoinHandle};

use crate::services::{Publisher, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Clock sync pending
    Ready,
    /// Sending the enable batch at this index
    Enabling(usize),
    Configured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// `config` was sent
    Configured,
    /// A newer handshake for the node took over
    Superseded,
}

/// Everything a handshake publishes, computed up front
#[derive(Debug, Clone)]
pub struct HandshakePlan {
    node_hw_id: HardwareId,
    topic: String,
    settime: OffsetDateTime,
    batches: Vec<EnableBatch>,
    sensors: Vec<Sensor>,
}

impl HandshakePlan {
    pub fn new(outbound_prefix: &str, node: &Node, sensors: Vec<Sensor>, settime: OffsetDateTime) -> Self {
        Self {
            node_hw_id: node.hw_id,
            topic: outbound_topic(outbound_prefix, node.hw_id),
            settime,
            batches: build_enable_batches(&sensors),
            sensors,
        }
    }

    pub fn node_hw_id(&self) -> HardwareId {
        self.node_hw_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn command(&self, state: HandshakeState) -> Option<OutboundCommand> {
        match state {
            HandshakeState::Ready => Some(OutboundCommand::SetTime(self.settime)),
            HandshakeState::Enabling(index) => self.batches.get(index).cloned().map(OutboundCommand::Enable),
            HandshakeState::Configured => Some(OutboundCommand::Config),
        }
    }

    /// State after `state` has been published, `None` once configured
    pub fn next(&self, state: HandshakeState) -> Option<HandshakeState> {
        let enabling = |index: usize| {
            if index < self.batches.len() {
                HandshakeState::Enabling(index)
            } else {
                HandshakeState::Configured
            }
        };

        match state {
            HandshakeState::Ready => Some(enabling(0)),
            HandshakeState::Enabling(index) => Some(enabling(index + 1)),
            HandshakeState::Configured => None,
        }
    }

    /// The full publish order
    pub fn commands(&self) -> Vec<OutboundCommand> {
        let mut commands = Vec::with_capacity(self.batches.len() + 2);
        let mut state = Some(HandshakeState::Ready);

        while let Some(current) = state {
            commands.extend(self.command(current));
            state = self.next(current);
        }

        commands
    }

    fn sensors_in(&self, state: HandshakeState) -> Vec<&Sensor> {
        let HandshakeState::Enabling(index) = state else {
            return Vec::new();
        };
        let Some(batch) = self.batches.get(index) else {
            return Vec::new();
        };

        batch
            .sensor_ids()
            .filter_map(|id| self.sensors.iter().find(|sensor| sensor.id == id))
            .collect()
    }
}

#[derive(Clone)]
pub struct HandshakeSequencer {
    publisher: Arc<dyn Publisher>,
    registry: Arc<dyn Registry>,
    pacing: Duration,
    generations: Arc<Mutex<HashMap<HardwareId, u64>>>,
    tasks: Arc<Mutex<Vec<AbortHandle>>>,
}

impl HandshakeSequencer {
    pub fn new(publisher: Arc<dyn Publisher>, registry: Arc<dyn Registry>, pacing: Duration) -> Self {
        Self {
            publisher,
            registry,
            pacing,
            generations: Arc::new(Mutex::new(HashMap::new())),
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Starts a handshake, superseding any still running for the same node
    pub fn start(&self, plan: HandshakePlan) -> JoinHandle<HandshakeOutcome> {
        let generation = self.bump(plan.node_hw_id);
        let sequencer = self.clone();

        let handle = tokio::spawn(async move { sequencer.drive(plan, generation).await });

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle.abort_handle());

        handle
    }

    /// Cancels every running handshake; returns how many were still running
    pub fn abort_all(&self) -> usize {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        let running = tasks.drain(..).filter(|task| !task.is_finished()).collect::<Vec<_>>();

        for task in &running {
            task.abort();
        }

        running.len()
    }

    fn bump(&self, node_hw_id: HardwareId) -> u64 {
        let mut generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = generations.entry(node_hw_id).or_insert(0);
        *generation += 1;
        *generation
    }

    fn is_current(&self, node_hw_id: HardwareId, generation: u64) -> bool {
        let generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        generations.get(&node_hw_id) == Some(&generation)
    }

    async fn drive(&self, plan: HandshakePlan, generation: u64) -> HandshakeOutcome {
        let mut state = HandshakeState::Ready;

        loop {
            if !self.is_current(plan.node_hw_id, generation) {
                tracing::debug!("handshake #{} of node {} superseded", generation, plan.node_hw_id);
                return HandshakeOutcome::Superseded;
            }

            if let Some(command) = plan.command(state) {
                self.step(&plan, state, &command.to_string()).await;
            }

            match plan.next(state) {
                Some(next) => {
                    tokio::time::sleep(self.pacing).await;
                    state = next;
                }
                None => {
                    tracing::info!("node {} configured", plan.node_hw_id);
                    return HandshakeOutcome::Configured;
                }
            }
        }
    }

    async fn step(&self, plan: &HandshakePlan, state: HandshakeState, payload: &str) {
        if let Err(e) = self.publisher.publish(plan.topic(), payload).await {
            // best effort, the node may still accept later steps
            tracing::warn!("handshake publish {} to {} failed: {}", payload, plan.topic(), e);
            return;
        }

        let now = OffsetDateTime::now_utc();
        for sensor in plan.sensors_in(state) {
            if let Err(e) = self.registry.mark_sensor_enabled(sensor, now).await {
                tracing::error!("failed to mark sensor {} enabled: {}", sensor.id, e);
            }
        }
    }
}
