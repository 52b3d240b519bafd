//! Server configuration

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::broker::{CommandBroker, DEFAULT_COMMAND_TTL};

/// Which persistence collaborator backs the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store kind: {}", other)),
        }
    }
}

/// Configuration for the codesync server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Root directory for persistent data
    pub data_root: PathBuf,
    /// Port to listen on
    pub port: u16,
    /// Lifetime of a command, counted from creation
    pub command_ttl: Duration,
    /// Command store backend
    pub store: StoreKind,
    /// How often expired commands are swept from the store
    pub purge_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_root: codesync_common::data_root(),
            port: 5500,
            command_ttl: DEFAULT_COMMAND_TTL,
            store: StoreKind::Sqlite,
            purge_interval: Duration::from_secs(60),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

impl ServerConfig {
    /// Defaults overridden by `CODESYNC_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_or("CODESYNC_PORT", defaults.port),
            command_ttl: Duration::from_secs(env_or(
                "CODESYNC_COMMAND_TTL_SECS",
                defaults.command_ttl.as_secs(),
            )),
            store: env_or("CODESYNC_STORE", defaults.store),
            purge_interval: Duration::from_secs(env_or(
                "CODESYNC_PURGE_INTERVAL_SECS",
                defaults.purge_interval.as_secs(),
            )),
            ..defaults
        }
    }

    /// Create config with custom base directory
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_root: base_dir.into(),
            ..Self::default()
        }
    }

    /// SQLite command database location
    pub fn db_path(&self) -> PathBuf {
        codesync_common::db_path_in(&self.data_root)
    }

    /// Ensure all directories exist
    pub fn ensure_dirs(&self) -> anyhow::Result<PathBuf> {
        codesync_common::init_structure_in(&self.data_root)
    }
}

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<CommandBroker>,
}

impl AppState {
    pub fn new(broker: CommandBroker) -> Self {
        Self {
            broker: Arc::new(broker),
        }
    }
}
