//! In-memory collaborators for tests and local runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use kerilog_api::{HardwareId, Id, Node, PointValue, Sensor, SensorKind, TelemetryPoint};
use time::OffsetDateTime;

use crate::errors::{PublishError, StorageError};
use crate::services::{PointStore, Publisher, Registry};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
pub struct MemoryRegistry {
    nodes: Mutex<Vec<Node>>,
    sensors: Mutex<Vec<Sensor>>,
    marks: Mutex<Vec<(Id, OffsetDateTime)>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(self, node: Node) -> Self {
        lock(&self.nodes).push(node);
        self
    }

    pub fn with_sensor(self, sensor: Sensor) -> Self {
        lock(&self.sensors).push(sensor);
        self
    }

    /// Sensor ids passed to `mark_sensor_enabled`, in call order
    pub fn marked(&self) -> Vec<Id> {
        lock(&self.marks).iter().map(|(id, _)| *id).collect()
    }

    fn node_id_of(&self, hw_id: HardwareId) -> Option<Id> {
        lock(&self.nodes)
            .iter()
            .find(|node| node.hw_id == hw_id)
            .map(|node| node.id)
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn node_by_hardware_id(&self, hw_id: HardwareId) -> Result<Option<Node>, StorageError> {
        Ok(lock(&self.nodes).iter().find(|node| node.hw_id == hw_id).cloned())
    }

    async fn sensor_by_id(&self, id: Id) -> Result<Option<Sensor>, StorageError> {
        Ok(lock(&self.sensors).iter().find(|sensor| sensor.id == id).cloned())
    }

    async fn sensor_by_node_hw_id_and_type(
        &self,
        node_hw_id: HardwareId,
        hw_id: HardwareId,
        kind: SensorKind,
    ) -> Result<Option<Sensor>, StorageError> {
        let Some(node_id) = self.node_id_of(node_hw_id) else {
            return Ok(None);
        };

        Ok(lock(&self.sensors)
            .iter()
            .find(|sensor| sensor.node_id == node_id && sensor.hw_id == hw_id && sensor.kind() == kind)
            .cloned())
    }

    async fn sensors_by_node(&self, node_hw_id: HardwareId) -> Result<Vec<Sensor>, StorageError> {
        let Some(node_id) = self.node_id_of(node_hw_id) else {
            return Ok(Vec::new());
        };

        Ok(lock(&self.sensors)
            .iter()
            .filter(|sensor| sensor.node_id == node_id)
            .cloned()
            .collect())
    }

    async fn mark_sensor_enabled(&self, sensor: &Sensor, time: OffsetDateTime) -> Result<(), StorageError> {
        lock(&self.marks).push((sensor.id, time));
        if let Some(stored) = lock(&self.sensors).iter_mut().find(|stored| stored.id == sensor.id) {
            stored.last_enabled = Some(time);
        }

        Ok(())
    }
}

/// Keyed by `(series, timestamp)`, first write wins
#[derive(Default)]
pub struct MemoryStore {
    points: Mutex<BTreeMap<(String, i64), PointValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> Vec<TelemetryPoint> {
        lock(&self.points)
            .iter()
            .map(|((series, timestamp), value)| TelemetryPoint::new(series.clone(), *timestamp, value.clone()))
            .collect()
    }

    pub fn series(&self, series: &str) -> Vec<TelemetryPoint> {
        self.points()
            .into_iter()
            .filter(|point| point.series == series)
            .collect()
    }
}

#[async_trait]
impl PointStore for MemoryStore {
    async fn append_points(&self, points: &[TelemetryPoint]) -> Result<usize, StorageError> {
        let mut stored = lock(&self.points);
        let mut inserted = 0;

        for point in points {
            let key = (point.series.clone(), point.timestamp);
            if !stored.contains_key(&key) {
                stored.insert(key, point.value.clone());
                inserted += 1;
            }
        }

        Ok(inserted)
    }

    async fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Keeps every `(topic, payload)` it was asked to publish
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, String)>>,
    offline: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every publish fails, but is still recorded
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<(String, String)> {
        lock(&self.published).clone()
    }

    pub fn payloads(&self) -> Vec<String> {
        lock(&self.published)
            .iter()
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        lock(&self.published).push((topic.to_string(), payload.to_string()));

        if self.offline.load(Ordering::SeqCst) {
            return Err(PublishError::Rejected(String::from("publisher offline")));
        }

        Ok(())
    }
}
