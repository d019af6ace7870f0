use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Broker {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    /// Keep-alive interval in seconds
    pub keep_alive: u64,
    /// Bound of the outgoing request queue
    pub capacity: usize,
    pub qos: u8,
    pub auth: Option<BrokerAuth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerAuth {
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topics {
    /// Subscription filter for bridge traffic
    pub bridge: String,
    /// Subscription filter for node traffic
    pub node: String,
    /// Prefix of the per-node command topic
    pub outbound: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            bridge: kerilog_api::topic::DEFAULT_BRIDGE_FILTER.to_string(),
            node: kerilog_api::topic::DEFAULT_NODE_FILTER.to_string(),
            outbound: kerilog_api::command::DEFAULT_OUTBOUND_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub migration_path: Option<String>,
    pub clean_start: bool,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Handshake {
    /// Delay between two publishes to the same node
    pub pacing_ms: u64,
}

impl Handshake {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub logger: Logger,
    pub broker: Broker,
    pub topics: Topics,
    pub database: Database,
    pub handshake: Handshake,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        let mut settings: Settings = Config::builder()
            .add_source(File::with_name("configs/default"))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(Environment::with_prefix("KERILOG").separator("__"))
            .build()?
            .try_deserialize()?;

        if let Some(auth) = &settings.broker.auth {
            let cert_path = normalize_path(&auth.cert_path)
                .map_err(|e| ConfigError::Message(e.to_string()))?
                .to_string_lossy()
                .to_string();
            let key_path = normalize_path(&auth.key_path)
                .map_err(|e| ConfigError::Message(e.to_string()))?
                .to_string_lossy()
                .to_string();

            settings.broker.auth = Some(BrokerAuth { cert_path, key_path });
        }

        if let Some(migrate) = &settings.database.migration_path {
            let migrate_path = normalize_path(migrate).map_err(|e| ConfigError::Message(e.to_string()))?;

            settings.database.migration_path = migrate_path
                .is_dir()
                .then(|| migrate_path.to_string_lossy().to_string());
        }

        Ok(settings)
    }
}

fn project_root() -> Result<PathBuf, io::Error> {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        // development and testing environments
        Ok(PathBuf::from(manifest_dir))
    } else {
        // runtime root relative path `folder/executable` -> `folder/`
        let exe = env::current_exe()?;
        exe.parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "executable has no parent directory"))
    }
}

/// Expands a leading `~/` to the project root
pub fn normalize_path(path: &str) -> Result<PathBuf, io::Error> {
    match path.strip_prefix("~/") {
        Some(relative) => Ok(project_root()?.join(relative)),
        None => Ok(PathBuf::from(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain_path() {
        assert_eq!(
            normalize_path("/etc/kerilog/cert.pem").unwrap(),
            PathBuf::from("/etc/kerilog/cert.pem")
        );
    }

    #[test]
    fn test_normalize_home_relative_path() {
        let path = normalize_path("~/certs/key.pem").unwrap();

        assert!(path.ends_with("certs/key.pem"));
        assert!(path.is_absolute());
    }

    #[test]
    fn test_pacing_duration() {
        let handshake = Handshake { pacing_ms: 500 };

        assert_eq!(handshake.pacing(), Duration::from_millis(500));
    }
}
