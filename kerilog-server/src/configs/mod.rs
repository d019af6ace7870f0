mod schema;
mod settings;
mod storage;

pub use schema::SchemaManager;
pub use settings::{normalize_path, Broker, BrokerAuth, Database, Handshake, Logger, Server, Settings, Topics};
pub use storage::Storage;
