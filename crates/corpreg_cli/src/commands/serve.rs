//! Serve command implementation.

use corpreg_server::{RegistryServer, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Runs the registry server until Ctrl-C or SIGTERM.
pub async fn run(
    addr: SocketAddr,
    file: PathBuf,
    compaction_interval_secs: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::new(addr)
        .with_data_file(&file)
        .with_compaction_interval(Duration::from_secs(compaction_interval_secs.max(1)));

    let server = RegistryServer::open(config)
        .map_err(|e| format!("failed to open {}: {e}", file.display()))?;

    server.run(super::shutdown_signal()).await?;
    Ok(())
}
