//! HTTP source transport.

use crate::config::ReconcilerConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::SourceTransport;
use async_trait::async_trait;
use corpreg_core::Company;

/// Fetches the active list with `GET {server_url}/`.
///
/// The client carries connect, request, and idle timeouts from the
/// [`ReconcilerConfig`]; a timeout surfaces as [`SyncError::Timeout`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    list_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport for the registry at `config.server_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ReconcilerConfig) -> SyncResult<Self> {
        let idle = config.effective_idle_timeout();
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .pool_idle_timeout(idle)
            .pool_max_idle_per_host(10)
            .tcp_keepalive(idle)
            .build()
            .map_err(|e| SyncError::transport_fatal(format!("failed to build http client: {e}")))?;

        Ok(Self {
            list_url: format!("{}/", config.server_url.trim_end_matches('/')),
            client,
        })
    }

    /// Returns the URL fetched each cycle.
    pub fn list_url(&self) -> &str {
        &self.list_url
    }
}

#[async_trait]
impl SourceTransport for HttpTransport {
    async fn fetch_active(&self) -> SyncResult<Vec<Company>> {
        let response = self.client.get(&self.list_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::ServerStatus(status.as_u16()));
        }

        let companies = response.json::<Vec<Company>>().await?;
        tracing::trace!(url = %self.list_url, count = companies.len(), "fetched active list");
        Ok(companies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn list_url_normalizes_trailing_slash() {
        let transport =
            HttpTransport::new(&ReconcilerConfig::new("http://registry:8080/")).unwrap();
        assert_eq!(transport.list_url(), "http://registry:8080/");

        let transport =
            HttpTransport::new(&ReconcilerConfig::new("http://registry:8080")).unwrap();
        assert_eq!(transport.list_url(), "http://registry:8080/");
    }

    #[tokio::test]
    async fn unreachable_server_is_retryable() {
        // Bind then drop to get a port nobody listens on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let config = ReconcilerConfig::new(format!("http://127.0.0.1:{port}"))
            .with_connect_timeout(Duration::from_millis(200))
            .with_request_timeout(Duration::from_millis(500));
        let transport = HttpTransport::new(&config).unwrap();

        let err = transport.fetch_active().await.unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err}");
    }
}
