//! Configuration for the reconciler.

use corpreg_core::MIN_INTERVAL;
use std::time::Duration;

/// Configuration for reconcile cycles.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Registry base URL (e.g., "http://127.0.0.1:8080").
    pub server_url: String,
    /// Time between cycle starts.
    pub poll_interval: Duration,
    /// TCP connect timeout for the fetch.
    pub connect_timeout: Duration,
    /// Whole-request timeout for the fetch.
    pub request_timeout: Duration,
    /// Idle connection and keepalive timeout. `None` means twice the poll
    /// interval.
    pub idle_timeout: Option<Duration>,
    /// How long a sink statement waits on a locked database.
    pub sink_busy_timeout: Duration,
}

impl ReconcilerConfig {
    /// Creates a new reconciler configuration.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            poll_interval: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(1),
            request_timeout: Duration::from_secs(1),
            idle_timeout: None,
            sink_busy_timeout: Duration::from_secs(5),
        }
    }

    /// Sets the poll interval, at least [`MIN_INTERVAL`].
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_INTERVAL);
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the idle connection timeout.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Sets the sink busy timeout.
    pub fn with_sink_busy_timeout(mut self, timeout: Duration) -> Self {
        self.sink_busy_timeout = timeout;
        self
    }

    /// Effective idle timeout.
    pub fn effective_idle_timeout(&self) -> Duration {
        self.idle_timeout.unwrap_or(self.poll_interval * 2)
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self::new("http://127.0.0.1:8080")
    }
}
