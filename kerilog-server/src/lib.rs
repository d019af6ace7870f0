use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::app::create_app;
use crate::configs::{SchemaManager, Settings, Storage};
use crate::services::{
    mqtt_client, qos_of, Dispatcher, Gateway, MqttPublisher, PointStore, Publisher, Registry, SqliteRegistry,
    SqliteStore,
};

pub mod app;
pub mod configs;
pub mod errors;
pub mod handles;
pub mod models;
pub mod repositories;
pub mod services;

pub async fn run(settings: &Arc<Settings>) -> anyhow::Result<()> {
    let storage = Arc::new(
        Storage::new(settings.database.clone(), SchemaManager::default())
            .await
            .context("failed to open database")?,
    );
    let registry: Arc<dyn Registry> = Arc::new(SqliteRegistry::new(storage.clone()));
    let store: Arc<dyn PointStore> = Arc::new(SqliteStore::new(storage.clone()));

    let qos = qos_of(settings.broker.qos).map_err(|e| anyhow!("invalid broker settings: {e}"))?;
    let (client, event_loop) =
        mqtt_client(&settings.broker).map_err(|e| anyhow!("failed to configure MQTT client: {e}"))?;
    let publisher: Arc<dyn Publisher> = Arc::new(MqttPublisher::new(client.clone(), qos));

    let dispatcher = Arc::new(Dispatcher::new(
        &settings.topics,
        settings.handshake.pacing(),
        registry.clone(),
        store.clone(),
        publisher,
    ));
    let gateway = Gateway::new(client, event_loop, &settings.topics, qos, dispatcher.clone());

    let app = create_app(storage.clone(), registry);

    let ip_addr = settings.server.host.parse::<IpAddr>()?;
    let address = SocketAddr::from((ip_addr, settings.server.port));
    let listener = TcpListener::bind(&address).await?;

    tracing::info!("listening on {:?}", address);

    let (stop_sender, stop_receiver) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_receiver.await;
            })
            .await
    });

    tracing::info!("gateway started for broker {}:{}", settings.broker.host, settings.broker.port);
    gateway.run(shutdown_signal()).await;

    let _ = stop_sender.send(());
    let served = server.await;

    wind_down(&dispatcher, store.as_ref(), &storage).await;
    served??;

    Ok(())
}

/// Runs after the receive loop exits, whatever the HTTP server returned
async fn wind_down(dispatcher: &Dispatcher, store: &dyn PointStore, storage: &Storage) {
    let aborted = dispatcher.abort_handshakes();
    if aborted > 0 {
        tracing::info!("aborted {} running handshakes", aborted);
    }

    if let Err(e) = store.flush().await {
        tracing::error!("failed to flush point store: {}", e);
    }
    storage.close().await;
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }

    tracing::info!("shutdown requested");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use kerilog_api::{Node, TelemetryPoint};

    use crate::configs::{Database, Topics};
    use crate::errors::StorageError;
    use crate::services::mock::{MemoryRegistry, RecordingPublisher};
    use crate::services::DispatchOutcome;

    use super::*;

    #[derive(Default)]
    struct FlushRecorder {
        flushed: AtomicBool,
    }

    #[async_trait]
    impl PointStore for FlushRecorder {
        async fn append_points(&self, points: &[TelemetryPoint]) -> Result<usize, StorageError> {
            Ok(points.len())
        }

        async fn flush(&self) -> Result<(), StorageError> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_wind_down_aborts_handshakes_then_flushes() {
        let storage = Storage::new(
            Database {
                migration_path: None,
                clean_start: true,
                url: String::from("sqlite::memory:"),
            },
            SchemaManager::default(),
        )
        .await
        .unwrap();
        let registry = Arc::new(MemoryRegistry::new().with_node(Node {
            id: 1,
            hw_id: 42,
            name: String::from("garden"),
        }));
        let store = Arc::new(FlushRecorder::default());
        let publisher = Arc::new(RecordingPublisher::new());
        let dispatcher = Dispatcher::new(
            &Topics::default(),
            Duration::from_secs(60),
            registry,
            store.clone(),
            publisher.clone(),
        );

        let DispatchOutcome::Handshake(handle) = dispatcher.dispatch("fromNode/42/init", "ready").await else {
            panic!("expected a handshake");
        };

        wind_down(&dispatcher, store.as_ref(), &storage).await;

        assert!(handle.await.unwrap_err().is_cancelled());
        assert!(store.flushed.load(Ordering::SeqCst));
        assert!(storage.get_pool().is_closed());
        assert!(publisher.payloads().len() <= 1);
    }
}
