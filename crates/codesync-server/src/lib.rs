//! Codesync command server library
//!
//! Command broker between a web client and a remote editor agent, backed by
//! an in-memory or SQLite store and exposed over a small JSON HTTP API.

pub mod agent;
pub mod broker;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod store;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use broker::CommandBroker;
use config::{AppState, ServerConfig, StoreKind};
use store::{CommandStore, MemoryCommandStore, SqliteCommandStore};

pub use router::router;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "codesync_server=debug,tower_http=info,info".into());

    // Already set (tests, embedding), ignore
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Open the store selected by `config`.
pub async fn open_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn CommandStore>> {
    let store: Arc<dyn CommandStore> = match config.store {
        StoreKind::Memory => Arc::new(MemoryCommandStore::new()),
        StoreKind::Sqlite => {
            config.ensure_dirs()?;
            let db_path = config.db_path();
            info!("Commands database: {:?}", db_path);
            Arc::new(SqliteCommandStore::new(&db_path).await?)
        }
    };
    Ok(store)
}

/// Periodically drop expired commands. Expired records are already
/// invisible; this only reclaims space.
pub fn spawn_purge_task(broker: CommandBroker, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = broker.purge_expired().await {
                warn!("Failed to purge expired commands: {}", e);
            }
        }
    })
}

pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    let config = ServerConfig::from_env();
    info!("=== Codesync Server ===");
    let store = open_store(&config).await?;
    let broker = CommandBroker::new(store, config.command_ttl);
    info!(
        "Store: {:?} | Command TTL: {}s",
        config.store,
        broker.ttl().num_seconds()
    );
    let _purge = spawn_purge_task(broker.clone(), config.purge_interval);

    let app = router(AppState::new(broker));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Codesync server listening on http://localhost:{}", config.port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
