//! Error types for sqlhook

use std::time::Duration;
use thiserror::Error;

/// Boxed error used to carry driver and scanner failures verbatim.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for sqlhook operations
pub type DbResult<T> = Result<T, DbError>;

/// Opening a connection or checking its liveness took longer than the connect timeout.
#[derive(Debug, Error)]
#[error("connect timeout after {0:?}")]
pub struct ConnectTimeout(pub Duration);

/// Error types for facade operations
#[derive(Debug, Error)]
pub enum DbError {
    /// Opening the connection or the liveness check failed
    #[error("Connection error: {0}")]
    Connection(#[source] BoxError),

    /// The driver rejected or failed a query/execute call
    #[error("Query error: {0}")]
    Query(#[source] BoxError),

    /// A single-row fetch matched no rows
    #[error("No rows in result set")]
    NoRows,

    /// The row scanner failed to consume a row
    #[error("Scan error: {0}")]
    Scan(#[source] BoxError),

    /// Begin, commit or rollback failed at the driver level
    #[error("Transaction error: {0}")]
    Transaction(#[source] BoxError),

    /// The configured per-query timeout elapsed
    #[error("Query timeout after {0:?}")]
    Timeout(Duration),

    /// The caller's context was cancelled
    #[error("Context cancelled")]
    Cancelled,

    /// The caller's context deadline passed
    #[error("Context deadline exceeded")]
    DeadlineExceeded,
}

impl DbError {
    /// Create a connection error from any driver error
    pub fn connection(err: impl Into<BoxError>) -> Self {
        Self::Connection(err.into())
    }

    /// Create a query error from any driver error
    pub fn query(err: impl Into<BoxError>) -> Self {
        Self::Query(err.into())
    }

    /// Create a scan error from any scanner error
    pub fn scan(err: impl Into<BoxError>) -> Self {
        Self::Scan(err.into())
    }

    /// Create a transaction error from any driver error
    pub fn transaction(err: impl Into<BoxError>) -> Self {
        Self::Transaction(err.into())
    }

    /// Check if this is the "no rows" outcome of a single-row fetch
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Self::NoRows)
    }

    /// Check if this is a connection error
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if the operation was interrupted by its context or a timeout
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Cancelled | Self::DeadlineExceeded)
    }

    /// The PostgreSQL SQLSTATE code of the underlying driver error, if any.
    pub fn sqlstate(&self) -> Option<&str> {
        let source = match self {
            Self::Connection(e) | Self::Query(e) | Self::Transaction(e) => e,
            _ => return None,
        };
        source
            .downcast_ref::<tokio_postgres::Error>()
            .and_then(|e| e.code())
            .map(|code| code.code())
    }

    /// Check if this is a unique constraint violation (SQLSTATE 23505)
    pub fn is_unique_violation(&self) -> bool {
        self.sqlstate() == Some("23505")
    }

    /// Reclassify a failed open or liveness check as a connection error.
    ///
    /// The only timeout on that path is `DbConfig::connect_timeout`, so `Timeout` becomes a
    /// connection error carrying [`ConnectTimeout`]. Interruptions by the caller's context
    /// and errors that already are connection errors pass through unchanged.
    pub(crate) fn into_connection(self) -> Self {
        match self {
            e @ (Self::Connection(_) | Self::Cancelled | Self::DeadlineExceeded) => e,
            Self::Timeout(elapsed) => Self::Connection(Box::new(ConnectTimeout(elapsed))),
            other => Self::Connection(Box::new(other)),
        }
    }
}
