//! Reconcile command implementation.

use corpreg_sync::{HttpTransport, Reconciler, ReconcilerConfig, SqliteSink};
use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;

/// Seeds from the sink, then reconciles on the interval until Ctrl-C or
/// SIGTERM.
pub async fn run(
    dsn: &Path,
    server_addr: String,
    update_interval_secs: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ReconcilerConfig::new(server_addr)
        .with_poll_interval(Duration::from_secs(update_interval_secs.max(1)));

    let sink = SqliteSink::open(dsn, config.sink_busy_timeout)
        .map_err(|e| format!("failed to open database {}: {e}", dsn.display()))?;
    let transport = HttpTransport::new(&config)?;
    let reconciler = Reconciler::new(config, transport, sink);

    reconciler.seed_from_sink().await?;

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        super::shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    reconciler.run(stop_rx).await;
    Ok(())
}
