//! Registry server implementation.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::RegistryHandler;
use crate::http::router;
use axum::Router;
use corpreg_core::{DurableLog, IndexedStore, MIN_INTERVAL};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// The registry server.
///
/// Owns the shared store, serves it over HTTP, and runs the compaction loop
/// for as long as it is serving.
///
/// # Example
///
/// ```rust,ignore
/// use corpreg_server::{RegistryServer, ServerConfig};
///
/// let server = RegistryServer::open(ServerConfig::default().with_data_file("companies.csv"))?;
/// let listener = tokio::net::TcpListener::bind(server.config().bind_addr).await?;
/// server.serve(listener, async { tokio::signal::ctrl_c().await.ok(); }).await?;
/// ```
#[derive(Debug)]
pub struct RegistryServer {
    config: ServerConfig,
    store: Arc<IndexedStore>,
}

impl RegistryServer {
    /// Opens the backing file and seeds the store from it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or holds a malformed row.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        let log = DurableLog::open_file(&config.data_file)?;
        let store = IndexedStore::open_with_config(log, &config.store)?;
        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// Creates a server around an existing store.
    pub fn with_store(config: ServerConfig, store: Arc<IndexedStore>) -> Self {
        Self { config, store }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the shared store.
    pub fn store(&self) -> &Arc<IndexedStore> {
        &self.store
    }

    /// Builds the HTTP router for this server.
    pub fn router(&self) -> Router {
        router(
            RegistryHandler::new(Arc::clone(&self.store)),
            self.config.body_limit,
        )
    }

    /// Starts the compaction loop. It exits once `shutdown` turns true or
    /// its sender is dropped.
    pub fn spawn_compaction(&self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(compaction_loop(
            Arc::clone(&self.store),
            self.config.store.compaction_interval,
            shutdown,
        ))
    }

    /// Binds the configured address and serves until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or serving fails.
    pub async fn run<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serves on `listener` until `shutdown` resolves, then stops the
    /// compaction loop.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let compaction = self.spawn_compaction(stop_rx);

        info!(addr = %listener.local_addr()?, "registry listening");
        let served = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await;

        let _ = stop_tx.send(true);
        if let Err(e) = compaction.await {
            error!(error = %e, "compaction task failed");
        }

        let stats = self.store.stats();
        info!(
            active = stats.active,
            write_through_failures = stats.write_through_failures,
            compactions = stats.compactions,
            "registry stopped"
        );

        served.map_err(Into::into)
    }
}

async fn compaction_loop(
    store: Arc<IndexedStore>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    // `ServerConfig` fields are public, so a zero period can still get here.
    let period = period.max(MIN_INTERVAL);

    // First check one full period after start.
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = ticker.tick() => {
                if store.maybe_compact().is_none() {
                    debug!("compaction not needed");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    debug!("compaction loop stopped");
}
