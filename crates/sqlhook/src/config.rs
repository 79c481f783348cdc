use std::time::Duration;

/// Configuration for a connection facade and the transactions it starts.
///
/// Both limits apply on top of the caller's [`Context`](crate::Context): whichever fires
/// first aborts the operation.
#[derive(Debug, Clone, Default)]
pub struct DbConfig {
    /// Per-operation timeout for fetch/execute/commit/rollback. `None` means no timeout (default).
    pub query_timeout: Option<Duration>,
    /// Timeout for opening the connection and the liveness check. `None` means no timeout (default).
    pub connect_timeout: Option<Duration>,
}

impl DbConfig {
    /// Create a new configuration with defaults (no timeouts).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-operation timeout.
    ///
    /// Operations exceeding this duration are abandoned with `DbError::Timeout`, and the
    /// driver is asked to cancel the statement server-side.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}
