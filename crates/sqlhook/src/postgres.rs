//! PostgreSQL driver built on `tokio-postgres`.
//!
//! [`PgConnector`] opens `tokio_postgres::Client` connections. The driver traits are
//! implemented for:
//! - `tokio_postgres::Client`
//! - `tokio_postgres::Transaction<'_>`
//! - `deadpool_postgres::Client` (with the `pool` feature), so pooled connections can be
//!   adopted with [`Db::wrap`](crate::Db::wrap)
//!
//! Driver errors are classified by the step that failed: opening and pinging produce
//! `DbError::Connection`, queries and statements `DbError::Query`, and
//! begin/commit/rollback `DbError::Transaction`.

use crate::driver::{Connection, Connector, Executor, RowStream, TransactionHandle};
use crate::error::{DbError, DbResult};
use crate::transaction::{IsolationLevel, TransactionOptions};
use futures_util::TryStreamExt;
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};
use tokio_postgres::types::ToSql;
use tokio_postgres::{CancelToken, Client, NoTls, Row, Socket, Transaction, TransactionBuilder};

/// Opens PostgreSQL connections with the given TLS setup.
///
/// The connection task is spawned on the current tokio runtime. When it ends with an
/// error, the error is logged (with the `tracing` feature) and subsequent queries fail.
///
/// # Example
///
/// ```ignore
/// let db = Db::connect(&ctx, &PgConnector::no_tls(), "postgres://postgres@localhost/app").await?;
/// ```
#[derive(Debug, Clone)]
pub struct PgConnector<T = NoTls> {
    tls: T,
}

impl PgConnector<NoTls> {
    /// A connector for plaintext connections.
    pub fn no_tls() -> Self {
        Self { tls: NoTls }
    }
}

impl Default for PgConnector<NoTls> {
    fn default() -> Self {
        Self::no_tls()
    }
}

impl<T> PgConnector<T> {
    /// A connector using a custom TLS connector.
    pub fn new(tls: T) -> Self {
        Self { tls }
    }
}

impl<T> Connector for PgConnector<T>
where
    T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
    T::Stream: Sync + Send,
    T::TlsConnect: Sync + Send,
    <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    type Connection = Client;

    async fn open(&self, dsn: &str) -> DbResult<Client> {
        let (client, connection) = tokio_postgres::connect(dsn, self.tls.clone())
            .await
            .map_err(DbError::connection)?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                #[cfg(feature = "tracing")]
                tracing::error!(target: "sqlhook.db", error = %e, "connection task failed");
                #[cfg(not(feature = "tracing"))]
                let _ = e;
            }
        });

        Ok(client)
    }
}

fn spawn_cancel(token: CancelToken) {
    // Outside a runtime there is nothing to spawn on; cancellation is best effort.
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        return;
    };
    runtime.spawn(async move {
        if let Err(e) = token.cancel_query(NoTls).await {
            #[cfg(feature = "tracing")]
            tracing::debug!(target: "sqlhook.db", error = %e, "cancel request failed");
            #[cfg(not(feature = "tracing"))]
            let _ = e;
        }
    });
}

fn with_options<'a>(
    mut builder: TransactionBuilder<'a>,
    options: &TransactionOptions,
) -> TransactionBuilder<'a> {
    if let Some(level) = options.isolation {
        builder = builder.isolation_level(match level {
            IsolationLevel::ReadUncommitted => tokio_postgres::IsolationLevel::ReadUncommitted,
            IsolationLevel::ReadCommitted => tokio_postgres::IsolationLevel::ReadCommitted,
            IsolationLevel::RepeatableRead => tokio_postgres::IsolationLevel::RepeatableRead,
            IsolationLevel::Serializable => tokio_postgres::IsolationLevel::Serializable,
        });
    }
    if let Some(read_only) = options.read_only {
        builder = builder.read_only(read_only);
    }
    if let Some(deferrable) = options.deferrable {
        builder = builder.deferrable(deferrable);
    }
    builder
}

impl Executor for Client {
    type Row = Row;
    type ExecResult = u64;

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<RowStream<Row>> {
        let stream = Client::query_raw(self, sql, params.iter().copied())
            .await
            .map_err(DbError::query)?;
        Ok(RowStream::new(stream.map_err(DbError::query)))
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        Client::execute(self, sql, params)
            .await
            .map_err(DbError::query)
    }

    fn cancel_in_flight(&self) {
        spawn_cancel(self.cancel_token());
    }
}

impl Connection for Client {
    type Transaction<'c> = Transaction<'c>;

    async fn ping(&self) -> DbResult<()> {
        self.batch_execute("SELECT 1")
            .await
            .map_err(DbError::connection)
    }

    async fn begin(&mut self, options: Option<&TransactionOptions>) -> DbResult<Transaction<'_>> {
        let started = match options {
            None => self.transaction().await,
            Some(options) => with_options(self.build_transaction(), options).start().await,
        };
        started.map_err(DbError::transaction)
    }
}

impl Executor for Transaction<'_> {
    type Row = Row;
    type ExecResult = u64;

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<RowStream<Row>> {
        let stream = Transaction::query_raw(self, sql, params.iter().copied())
            .await
            .map_err(DbError::query)?;
        Ok(RowStream::new(stream.map_err(DbError::query)))
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        Transaction::execute(self, sql, params)
            .await
            .map_err(DbError::query)
    }

    fn cancel_in_flight(&self) {
        spawn_cancel(self.cancel_token());
    }
}

impl TransactionHandle for Transaction<'_> {
    async fn commit(self) -> DbResult<()> {
        Transaction::commit(self)
            .await
            .map_err(DbError::transaction)
    }

    async fn rollback(self) -> DbResult<()> {
        Transaction::rollback(self)
            .await
            .map_err(DbError::transaction)
    }
}

// Pooled clients deref to `tokio_postgres::Client`; delegate to it.
#[cfg(feature = "pool")]
impl Executor for deadpool_postgres::Client {
    type Row = Row;
    type ExecResult = u64;

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<RowStream<Row>> {
        Executor::query(&***self, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        Executor::execute(&***self, sql, params).await
    }

    fn cancel_in_flight(&self) {
        Executor::cancel_in_flight(&***self)
    }
}

#[cfg(feature = "pool")]
impl Connection for deadpool_postgres::Client {
    type Transaction<'c> = Transaction<'c>;

    async fn ping(&self) -> DbResult<()> {
        Connection::ping(&***self).await
    }

    async fn begin(&mut self, options: Option<&TransactionOptions>) -> DbResult<Transaction<'_>> {
        Connection::begin(&mut ***self, options).await
    }
}
