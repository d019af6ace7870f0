use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use kerilog_api::{HardwareId, Id, Node, Sensor, SensorType};
use kerilog_server::app::create_app;
use kerilog_server::configs::{Database, SchemaManager, Storage, Topics};
use kerilog_server::repositories::{DataPointRepository, NodeRepository, SensorRepository};
use kerilog_server::services::mock::RecordingPublisher;
use kerilog_server::services::{Dispatcher, Registry, SqliteRegistry, SqliteStore};

pub const PACING: Duration = Duration::from_millis(1);

pub struct MockApp {
    pub storage: Arc<Storage>,
    pub registry: Arc<SqliteRegistry>,
    pub publisher: Arc<RecordingPublisher>,
    pub dispatcher: Dispatcher,
    pub router: Router,
}

impl MockApp {
    pub async fn new() -> Self {
        let storage = Arc::new(
            Storage::new(
                Database {
                    migration_path: None,
                    clean_start: true,
                    url: String::from("sqlite::memory:"),
                },
                SchemaManager::default(),
            )
            .await
            .unwrap(),
        );

        let registry = Arc::new(SqliteRegistry::new(storage.clone()));
        let store = Arc::new(SqliteStore::new(storage.clone()));
        let publisher = Arc::new(RecordingPublisher::new());

        let dispatcher = Dispatcher::new(
            &Topics::default(),
            PACING,
            registry.clone(),
            store,
            publisher.clone(),
        );
        let router = create_app(storage.clone(), registry.clone() as Arc<dyn Registry>);

        Self {
            storage,
            registry,
            publisher,
            dispatcher,
            router,
        }
    }

    pub async fn create_test_node(&self, hw_id: HardwareId, name: &str) -> Node {
        let mut node = Node {
            id: 0,
            hw_id,
            name: name.to_string(),
        };

        let mut tx = self.storage.get_pool().begin().await.unwrap();
        node.id = NodeRepository::new(self.storage.clone())
            .create(&node, &mut tx)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        node
    }

    pub async fn create_test_sensor(
        &self,
        node: &Node,
        name: &str,
        hw_id: HardwareId,
        interval: i64,
        sensor_type: SensorType,
    ) -> Sensor {
        let mut sensor = Sensor {
            id: 0,
            node_id: node.id,
            name: name.to_string(),
            hw_id,
            interval,
            sensor_type,
            last_enabled: None,
        };

        let mut tx = self.storage.get_pool().begin().await.unwrap();
        sensor.id = SensorRepository::new(self.storage.clone())
            .create(&sensor, &mut tx)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        sensor
    }

    pub async fn find_sensor(&self, id: Id) -> Sensor {
        self.registry.sensor_by_id(id).await.unwrap().unwrap()
    }

    /// Stored `(time, value)` pairs of a series
    pub async fn series(&self, series: &str) -> Vec<(i64, String)> {
        DataPointRepository::new(self.storage.clone())
            .find_by_series(series)
            .await
            .unwrap()
            .into_iter()
            .map(|point| (point.time, point.value))
            .collect()
    }

    pub async fn count_points(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM data_points")
            .fetch_one(self.storage.get_pool())
            .await
            .unwrap()
    }
}
