//! Driver traits the facades are written against.
//!
//! The facades never talk to a database directly. A driver supplies a [`Connector`] that
//! opens a [`Connection`], which runs queries and starts transactions whose handles
//! implement [`TransactionHandle`]. Both connection and transaction handles share the
//! [`Executor`] surface, so the instrumentation layer is written once for both.
//!
//! The PostgreSQL implementation lives in [`crate::postgres`].

use crate::error::DbResult;
use crate::transaction::TransactionOptions;
use futures_core::Stream;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_postgres::types::ToSql;

/// Query and statement execution shared by connections and transactions.
pub trait Executor: Send + Sync {
    /// The driver's row type, handed to row scanners.
    type Row: Send;

    /// The driver's result descriptor for non-row-returning statements.
    type ExecResult: Send;

    /// Run a query and return a cursor over its rows.
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = DbResult<RowStream<Self::Row>>> + Send;

    /// Run a statement and return the driver's result descriptor.
    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = DbResult<Self::ExecResult>> + Send;

    /// Best-effort server-side cancellation of the statement currently running.
    ///
    /// Called after an operation was abandoned because its context was cancelled or a
    /// timeout elapsed. The default implementation does nothing.
    fn cancel_in_flight(&self) {}
}

/// A live database connection.
pub trait Connection: Executor {
    /// The transaction handle type borrowed from this connection.
    type Transaction<'c>: TransactionHandle<Row = Self::Row, ExecResult = Self::ExecResult>
    where
        Self: 'c;

    /// Round-trip health check.
    fn ping(&self) -> impl Future<Output = DbResult<()>> + Send;

    /// Start a transaction, optionally with explicit options.
    fn begin(
        &mut self,
        options: Option<&TransactionOptions>,
    ) -> impl Future<Output = DbResult<Self::Transaction<'_>>> + Send;
}

/// An in-flight transaction. Finalizing consumes the handle.
pub trait TransactionHandle: Executor {
    /// Commit the transaction.
    fn commit(self) -> impl Future<Output = DbResult<()>> + Send;

    /// Roll the transaction back.
    fn rollback(self) -> impl Future<Output = DbResult<()>> + Send;
}

/// Opens connections from a connection string. The connector identifies the driver.
pub trait Connector: Send + Sync {
    /// The connection type produced.
    type Connection: Connection;

    /// Open a connection. Liveness is checked separately via [`Connection::ping`].
    fn open(&self, dsn: &str) -> impl Future<Output = DbResult<Self::Connection>> + Send;
}

/// A cursor over query rows.
///
/// This is a type-erased wrapper around a `Stream<Item = DbResult<R>>` so that different
/// drivers can return a uniform cursor type.
#[must_use]
pub struct RowStream<R> {
    inner: Pin<Box<dyn Stream<Item = DbResult<R>> + Send>>,
}

impl<R> RowStream<R> {
    /// Create a new `RowStream` from any compatible stream.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = DbResult<R>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// Advance the cursor. `None` once the rows are exhausted.
    pub async fn next(&mut self) -> Option<DbResult<R>> {
        std::future::poll_fn(|cx| self.inner.as_mut().poll_next(cx)).await
    }
}

impl<R: Send + 'static> RowStream<R> {
    /// A cursor over rows that are already in memory.
    pub fn from_rows(rows: Vec<R>) -> Self {
        Self::new(VecStream(rows.into_iter()))
    }
}

impl<R> Stream for RowStream<R> {
    type Item = DbResult<R>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl<R> std::fmt::Debug for RowStream<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStream").finish_non_exhaustive()
    }
}

struct VecStream<R>(std::vec::IntoIter<R>);

impl<R> Unpin for VecStream<R> {}

impl<R> Stream for VecStream<R> {
    type Item = DbResult<R>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.0.next().map(Ok))
    }
}
