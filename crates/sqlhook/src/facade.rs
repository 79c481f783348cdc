//! One query surface over connections and transactions.
//!
//! Repository code that should run both on a connection and inside a transaction takes
//! `&impl Facade`:
//!
//! ```ignore
//! use sqlhook::{Context, DbResult, Facade};
//!
//! async fn rename_user(db: &impl Facade<ExecResult = u64>, ctx: &Context, id: i64, name: &str) -> DbResult<u64> {
//!     db.execute(ctx, "UPDATE users SET username = $1 WHERE id = $2", &[&name, &id]).await
//! }
//! ```

use crate::context::Context;
use crate::db::Db;
use crate::driver::{Connection, TransactionHandle};
use crate::error::DbResult;
use crate::hook::HookRegistry;
use crate::scan::{ScanMany, ScanOne};
use crate::transaction::Tx;
use std::future::Future;
use tokio_postgres::types::ToSql;

/// The fetch/execute surface shared by [`Db`] and [`Tx`].
pub trait Facade: Send + Sync {
    /// The driver's row type.
    type Row: Send;

    /// The driver's result descriptor for `execute`.
    type ExecResult: Send;

    /// See [`Db::fetch_one`].
    fn fetch_one<D>(
        &self,
        ctx: &Context,
        dest: &mut D,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = DbResult<()>> + Send
    where
        D: ScanOne<Self::Row> + Send + ?Sized;

    /// See [`Db::fetch_many`].
    fn fetch_many<D>(
        &self,
        ctx: &Context,
        dest: &mut D,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = DbResult<()>> + Send
    where
        D: ScanMany<Self::Row> + Send + ?Sized;

    /// See [`Db::execute`].
    fn execute(
        &self,
        ctx: &Context,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = DbResult<Self::ExecResult>> + Send;

    /// The hook registry shared by the connection and its transactions.
    fn hooks(&self) -> &HookRegistry;
}

impl<C: Connection> Facade for Db<C> {
    type Row = C::Row;
    type ExecResult = C::ExecResult;

    async fn fetch_one<D>(
        &self,
        ctx: &Context,
        dest: &mut D,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<()>
    where
        D: ScanOne<Self::Row> + Send + ?Sized,
    {
        Db::fetch_one(self, ctx, dest, sql, params).await
    }

    async fn fetch_many<D>(
        &self,
        ctx: &Context,
        dest: &mut D,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<()>
    where
        D: ScanMany<Self::Row> + Send + ?Sized,
    {
        Db::fetch_many(self, ctx, dest, sql, params).await
    }

    async fn execute(
        &self,
        ctx: &Context,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<Self::ExecResult> {
        Db::execute(self, ctx, sql, params).await
    }

    fn hooks(&self) -> &HookRegistry {
        Db::hooks(self)
    }
}

impl<T: TransactionHandle> Facade for Tx<T> {
    type Row = T::Row;
    type ExecResult = T::ExecResult;

    async fn fetch_one<D>(
        &self,
        ctx: &Context,
        dest: &mut D,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<()>
    where
        D: ScanOne<Self::Row> + Send + ?Sized,
    {
        Tx::fetch_one(self, ctx, dest, sql, params).await
    }

    async fn fetch_many<D>(
        &self,
        ctx: &Context,
        dest: &mut D,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<()>
    where
        D: ScanMany<Self::Row> + Send + ?Sized,
    {
        Tx::fetch_many(self, ctx, dest, sql, params).await
    }

    async fn execute(
        &self,
        ctx: &Context,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<Self::ExecResult> {
        Tx::execute(self, ctx, sql, params).await
    }

    fn hooks(&self) -> &HookRegistry {
        Tx::hooks(self)
    }
}
