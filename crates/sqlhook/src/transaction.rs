//! Transaction facade and transaction options.
//!
//! A [`Tx`] is started from a connection facade with [`Db::begin`](crate::Db::begin) or
//! [`Db::begin_with`](crate::Db::begin_with). It runs the same fetch/execute operations as
//! the connection, and every one of them fires the hooks registered on the connection,
//! including hooks registered after the transaction started.
//!
//! `commit` and `rollback` consume the transaction, so it cannot be used once finalized.
//! They do not fire hooks.
//!
//! # Example
//!
//! ```ignore
//! use sqlhook::{Context, IsolationLevel, TransactionOptions};
//!
//! let ctx = Context::background();
//! let opts = TransactionOptions::new()
//!     .isolation_level(IsolationLevel::Serializable)
//!     .read_only(false);
//!
//! let tx = db.begin_with(&ctx, &opts).await?;
//! tx.execute(&ctx, "UPDATE accounts SET balance = balance - $1 WHERE id = $2", &[&100_i64, &1_i64])
//!     .await?;
//! tx.commit(&ctx).await?;
//! ```

use crate::config::DbConfig;
use crate::context::Context;
use crate::driver::TransactionHandle;
use crate::error::DbResult;
use crate::hook::HookRegistry;
use crate::instrument::Instrumented;
use crate::scan::{ScanMany, ScanOne};
use tokio_postgres::types::ToSql;

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    /// `READ UNCOMMITTED`
    ReadUncommitted,
    /// `READ COMMITTED`
    ReadCommitted,
    /// `REPEATABLE READ`
    RepeatableRead,
    /// `SERIALIZABLE`
    Serializable,
}

/// Options for starting a transaction. Unset fields use the server's defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Isolation level.
    pub isolation: Option<IsolationLevel>,
    /// Access mode: `READ ONLY` when `true`, `READ WRITE` when `false`.
    pub read_only: Option<bool>,
    /// `DEFERRABLE` (only meaningful for serializable, read-only transactions).
    pub deferrable: Option<bool>,
}

impl TransactionOptions {
    /// Options with every field unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the isolation level.
    pub fn isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation = Some(level);
        self
    }

    /// Set the access mode.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = Some(read_only);
        self
    }

    /// Set deferrable mode.
    pub fn deferrable(mut self, deferrable: bool) -> Self {
        self.deferrable = Some(deferrable);
        self
    }
}

/// Transaction facade: one in-flight transaction plus the connection's hooks.
pub struct Tx<T> {
    handle: Option<T>,
    hooks: HookRegistry,
    config: DbConfig,
}

impl<T: TransactionHandle> Tx<T> {
    pub(crate) fn new(handle: T, hooks: HookRegistry, config: DbConfig) -> Self {
        Self {
            handle: Some(handle),
            hooks,
            config,
        }
    }

    fn live(&self) -> &T {
        self.handle
            .as_ref()
            .unwrap_or_else(|| unreachable!("transaction used after being finalized"))
    }

    fn instrumented(&self) -> Instrumented<'_, T> {
        Instrumented {
            exec: self.live(),
            hooks: &self.hooks,
            config: &self.config,
        }
    }

    /// Run a query inside the transaction and scan its first row into `dest`.
    ///
    /// Same semantics as [`Db::fetch_one`](crate::Db::fetch_one).
    pub async fn fetch_one<D>(
        &self,
        ctx: &Context,
        dest: &mut D,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<()>
    where
        D: ScanOne<T::Row> + Send + ?Sized,
    {
        self.instrumented().fetch_one(ctx, dest, sql, params).await
    }

    /// Run a query inside the transaction and scan every row into `dest`.
    ///
    /// Same semantics as [`Db::fetch_many`](crate::Db::fetch_many).
    pub async fn fetch_many<D>(
        &self,
        ctx: &Context,
        dest: &mut D,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<()>
    where
        D: ScanMany<T::Row> + Send + ?Sized,
    {
        self.instrumented().fetch_many(ctx, dest, sql, params).await
    }

    /// Run a statement inside the transaction.
    ///
    /// Same semantics as [`Db::execute`](crate::Db::execute).
    pub async fn execute(
        &self,
        ctx: &Context,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<T::ExecResult> {
        self.instrumented().execute(ctx, sql, params).await
    }

    /// Commit the transaction. Does not fire hooks.
    ///
    /// `COMMIT` is bounded by `query_timeout` and the context like any other statement, but
    /// no server-side cancel is sent. When this returns an interruption
    /// ([`DbError::is_interrupted`](crate::DbError::is_interrupted)) the outcome is unknown:
    /// the server may already have applied the commit.
    pub async fn commit(mut self, ctx: &Context) -> DbResult<()> {
        let handle = self.take();
        let result = ctx.run(self.config.query_timeout, handle.commit()).await;
        #[cfg(feature = "tracing")]
        match &result {
            Ok(()) => tracing::debug!(target: "sqlhook.tx", "transaction committed"),
            Err(e) if e.is_interrupted() => {
                tracing::warn!(target: "sqlhook.tx", error = %e, "commit interrupted, outcome unknown")
            }
            Err(e) => tracing::debug!(target: "sqlhook.tx", error = %e, "commit failed"),
        }
        result
    }

    /// Roll the transaction back. Does not fire hooks.
    ///
    /// Interruptions behave as for [`Tx::commit`]: the rollback may or may not have reached
    /// the server.
    pub async fn rollback(mut self, ctx: &Context) -> DbResult<()> {
        let handle = self.take();
        let result = ctx.run(self.config.query_timeout, handle.rollback()).await;
        #[cfg(feature = "tracing")]
        match &result {
            Ok(()) => tracing::debug!(target: "sqlhook.tx", "transaction rolled back"),
            Err(e) => tracing::debug!(target: "sqlhook.tx", error = %e, "rollback failed"),
        }
        result
    }

    /// The shared hook registry. Hooks registered through it fire on the connection too.
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Get a reference to the driver's transaction handle.
    pub fn inner(&self) -> &T {
        self.live()
    }

    fn take(&mut self) -> T {
        self.handle
            .take()
            .unwrap_or_else(|| unreachable!("transaction finalized twice"))
    }
}

impl<T> Drop for Tx<T> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            // The driver decides what an abandoned transaction means (tokio-postgres rolls back).
            #[cfg(feature = "tracing")]
            tracing::warn!(
                target: "sqlhook.tx",
                "transaction dropped without commit or rollback"
            );
        }
    }
}

impl<T> std::fmt::Debug for Tx<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tx")
            .field("finalized", &self.handle.is_none())
            .field("hooks", &self.hooks)
            .field("config", &self.config)
            .finish()
    }
}
