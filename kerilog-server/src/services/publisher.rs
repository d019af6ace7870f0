use async_trait::async_trait;
use rumqttc::{AsyncClient, QoS};

use crate::errors::PublishError;

/// Outbound side of the transport
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError>;
}

/// Queues publishes on the shared client; a full queue fails the publish
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
    qos: QoS,
}

impl MqttPublisher {
    pub fn new(client: AsyncClient, qos: QoS) -> Self {
        Self { client, qos }
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        // never wait for queue space, the receive loop may be the caller
        self.client
            .try_publish(topic, self.qos, false, payload.as_bytes().to_vec())?;

        tracing::debug!("publish {} -> {}", topic, payload);

        Ok(())
    }
}
