use std::error::Error;
use std::fs::File;
use std::future::Future;
use std::io::BufReader;
use std::sync::Arc;
use std::time::Duration;

use rumqttc::tokio_rustls::rustls::{ClientConfig, RootCertStore};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, TlsConfiguration, Transport};
use rustls_pemfile::{certs, read_one, Item};

use crate::configs::{Broker, BrokerAuth, Topics};
use crate::services::Dispatcher;

pub type BoxError = Box<dyn Error + Send + Sync>;

const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

pub fn qos_of(level: u8) -> Result<QoS, BoxError> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(format!("invalid qos level {other}").into()),
    }
}

/// Builds the client and its event loop; nothing is sent until the loop is polled
pub fn mqtt_client(broker: &Broker) -> Result<(AsyncClient, EventLoop), BoxError> {
    let mut options = MqttOptions::new(&broker.client_id, &broker.host, broker.port);
    options.set_keep_alive(Duration::from_secs(broker.keep_alive));

    if let Some(auth) = &broker.auth {
        options.set_transport(Transport::Tls(tls_configuration(auth)?));
    }

    Ok(AsyncClient::new(options, broker.capacity))
}

fn tls_configuration(auth: &BrokerAuth) -> Result<TlsConfiguration, BoxError> {
    let native = rustls_native_certs::load_native_certs();
    for e in &native.errors {
        tracing::warn!("skipping native certificate: {}", e);
    }

    let mut root_cert_store = RootCertStore::empty();
    root_cert_store.add_parsable_certificates(native.certs);

    let certs = certs(&mut BufReader::new(File::open(&auth.cert_path)?)).collect::<Result<Vec<_>, _>>()?;
    let mut key_buffer = BufReader::new(File::open(&auth.key_path)?);
    let key = loop {
        match read_one(&mut key_buffer)? {
            Some(Item::Sec1Key(key)) => break key.into(),
            Some(Item::Pkcs1Key(key)) => break key.into(),
            Some(Item::Pkcs8Key(key)) => break key.into(),
            None => return Err("no keys found or encrypted keys not supported".into()),
            _ => {}
        }
    };

    let tls_config = ClientConfig::builder()
        .with_root_certificates(root_cert_store)
        .with_client_auth_cert(certs, key)?;

    Ok(TlsConfiguration::from(tls_config))
}

/// The receive loop. Messages are dispatched one at a time in arrival order.
pub struct Gateway {
    client: AsyncClient,
    event_loop: EventLoop,
    filters: Vec<String>,
    qos: QoS,
    dispatcher: Arc<Dispatcher>,
}

impl Gateway {
    pub fn new(
        client: AsyncClient,
        event_loop: EventLoop,
        topics: &Topics,
        qos: QoS,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            client,
            event_loop,
            filters: vec![topics.bridge.clone(), topics.node.clone()],
            qos,
            dispatcher,
        }
    }

    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                event = self.event_loop.poll() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        tracing::info!("connected to broker");
                        self.subscribe();
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let payload = String::from_utf8_lossy(&publish.payload);
                        self.dispatcher.dispatch(&publish.topic, &payload).await;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!("MQTT error: {}", e);
                        tokio::time::sleep(RECONNECT_BACKOFF).await;
                    }
                },
            }
        }

        self.disconnect().await;
    }

    // subscriptions do not survive a clean session, renew them on every connect
    fn subscribe(&self) {
        for filter in &self.filters {
            match self.client.try_subscribe(filter, self.qos) {
                Ok(()) => tracing::debug!("subscribe topic {}", filter),
                Err(e) => tracing::error!("failed to subscribe {}: {}", filter, e),
            }
        }
    }

    async fn disconnect(mut self) {
        if let Err(e) = self.client.try_disconnect() {
            tracing::warn!("failed to request disconnect: {}", e);
            return;
        }

        // drive the loop until the disconnect is on the wire
        let drained = tokio::time::timeout(DISCONNECT_GRACE, async {
            while self.event_loop.poll().await.is_ok() {}
        })
        .await;

        if drained.is_err() {
            tracing::warn!("broker did not close the connection in time");
        } else {
            tracing::info!("disconnected from broker");
        }
    }
}
