//! Connection facade.

use crate::config::DbConfig;
use crate::context::Context;
use crate::driver::{Connection, Connector};
use crate::error::{DbError, DbResult};
use crate::hook::{HookRegistry, QueryDetails, QueryHook};
use crate::instrument::Instrumented;
use crate::scan::{ScanMany, ScanOne};
use crate::transaction::{TransactionOptions, Tx};
use tokio_postgres::types::ToSql;

/// A connection facade: one live connection plus the hooks observing it.
///
/// Every `fetch_one`, `fetch_many` and `execute` call, on the connection or on any
/// transaction started from it, fires every registered hook exactly once, in registration
/// order, after the driver work is done and before the call returns.
///
/// # Example
///
/// ```ignore
/// use sqlhook::{Context, Db, PgConnector};
///
/// let ctx = Context::background();
/// let mut db = Db::connect(&ctx, &PgConnector::no_tls(), &database_url).await?;
/// db.register_hook(sqlhook::TracingHook::new());
///
/// let mut count: Option<Count> = None;
/// db.fetch_one(&ctx, &mut count, "SELECT COUNT(*) FROM users", &[]).await?;
/// ```
pub struct Db<C> {
    conn: C,
    hooks: HookRegistry,
    config: DbConfig,
}

impl<C: Connection> Db<C> {
    /// Open a connection through `connector` and check that it is alive.
    ///
    /// Fails with [`DbError::Connection`] if opening or the liveness check fails.
    pub async fn connect<K>(ctx: &Context, connector: &K, dsn: &str) -> DbResult<Self>
    where
        K: Connector<Connection = C>,
    {
        Self::connect_with_config(ctx, connector, dsn, DbConfig::default()).await
    }

    /// Like [`Db::connect`], with explicit configuration.
    ///
    /// `config.connect_timeout` bounds opening and the liveness check together; running
    /// out of it is a [`DbError::Connection`] whose source is a
    /// [`ConnectTimeout`](crate::error::ConnectTimeout).
    pub async fn connect_with_config<K>(
        ctx: &Context,
        connector: &K,
        dsn: &str,
        config: DbConfig,
    ) -> DbResult<Self>
    where
        K: Connector<Connection = C>,
    {
        let conn = ctx
            .run(config.connect_timeout, async {
                let conn = connector.open(dsn).await.map_err(DbError::into_connection)?;
                conn.ping().await.map_err(DbError::into_connection)?;
                Ok(conn)
            })
            .await
            .map_err(DbError::into_connection)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(target: "sqlhook.db", "connection established");

        Ok(Self::from_parts(conn, config))
    }

    /// Adopt an already-open connection, e.g. one checked out of a pool.
    ///
    /// The connection is pinged first, with the same error contract as [`Db::connect`].
    pub async fn wrap(ctx: &Context, conn: C, config: DbConfig) -> DbResult<Self> {
        ctx.run(config.connect_timeout, conn.ping())
            .await
            .map_err(DbError::into_connection)?;
        Ok(Self::from_parts(conn, config))
    }

    fn from_parts(conn: C, config: DbConfig) -> Self {
        Self {
            conn,
            hooks: HookRegistry::new(),
            config,
        }
    }

    fn instrumented(&self) -> Instrumented<'_, C> {
        Instrumented {
            exec: &self.conn,
            hooks: &self.hooks,
            config: &self.config,
        }
    }

    /// Check that the connection is still alive.
    pub async fn ping(&self, ctx: &Context) -> DbResult<()> {
        ctx.run(self.config.connect_timeout, self.conn.ping())
            .await
            .map_err(DbError::into_connection)
    }

    /// Run a query and scan its first row into `dest`.
    ///
    /// Returns [`DbError::NoRows`] without calling the scanner when the query matches no
    /// rows. Rows after the first are discarded.
    pub async fn fetch_one<D>(
        &self,
        ctx: &Context,
        dest: &mut D,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<()>
    where
        D: ScanOne<C::Row> + Send + ?Sized,
    {
        self.instrumented().fetch_one(ctx, dest, sql, params).await
    }

    /// Run a query and scan every row, in order, into `dest`.
    ///
    /// Stops at the first scan failure and returns it as [`DbError::Scan`]. Zero rows is
    /// a success.
    pub async fn fetch_many<D>(
        &self,
        ctx: &Context,
        dest: &mut D,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<()>
    where
        D: ScanMany<C::Row> + Send + ?Sized,
    {
        self.instrumented().fetch_many(ctx, dest, sql, params).await
    }

    /// Run a statement and return the driver's result descriptor unchanged.
    pub async fn execute(
        &self,
        ctx: &Context,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<C::ExecResult> {
        self.instrumented().execute(ctx, sql, params).await
    }

    /// Start a transaction with the server's default options.
    ///
    /// The transaction shares this connection's hooks.
    pub async fn begin(&mut self, ctx: &Context) -> DbResult<Tx<C::Transaction<'_>>> {
        self.start(ctx, None).await
    }

    /// Start a transaction with explicit options.
    pub async fn begin_with(
        &mut self,
        ctx: &Context,
        options: &TransactionOptions,
    ) -> DbResult<Tx<C::Transaction<'_>>> {
        self.start(ctx, Some(options)).await
    }

    async fn start(
        &mut self,
        ctx: &Context,
        options: Option<&TransactionOptions>,
    ) -> DbResult<Tx<C::Transaction<'_>>> {
        let Self {
            conn,
            hooks,
            config,
        } = self;
        let handle = ctx.run(config.query_timeout, conn.begin(options)).await?;

        #[cfg(feature = "tracing")]
        tracing::debug!(target: "sqlhook.tx", ?options, "transaction started");

        Ok(Tx::new(handle, hooks.clone(), config.clone()))
    }

    /// Append a hook. No uniqueness check; hooks cannot be removed.
    pub fn register_hook<H: QueryHook + 'static>(&self, hook: H) {
        self.hooks.register(hook);
    }

    /// Append a closure hook.
    pub fn register_hook_fn<F>(&self, hook: F)
    where
        F: Fn(&Context, &QueryDetails<'_>, Option<&DbError>) + Send + Sync + 'static,
    {
        self.hooks.register_fn(hook);
    }

    /// The hook registry.
    ///
    /// Clone it to register hooks while a transaction borrows the connection; the clone
    /// refers to the same list.
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// The facade configuration.
    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Get a reference to the underlying driver connection.
    pub fn inner(&self) -> &C {
        &self.conn
    }

    /// Consume the facade and return the underlying driver connection.
    pub fn into_inner(self) -> C {
        self.conn
    }
}

impl<C> std::fmt::Debug for Db<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("hooks", &self.hooks)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
