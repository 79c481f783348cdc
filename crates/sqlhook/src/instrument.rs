//! The instrumentation envelope shared by both facades.
//!
//! `Db` and `Tx` differ only in the handle they run statements on, so the three query
//! shapes are implemented once here against any [`Executor`].

use crate::config::DbConfig;
use crate::context::Context;
use crate::driver::Executor;
use crate::error::{DbError, DbResult};
use crate::hook::{HookRegistry, QueryDetails, QueryFunction};
use crate::scan::{ScanMany, ScanOne};
use crate::statement::QueryType;
use std::time::{Instant, SystemTime};
use tokio_postgres::types::ToSql;

pub(crate) struct Instrumented<'a, E> {
    pub(crate) exec: &'a E,
    pub(crate) hooks: &'a HookRegistry,
    pub(crate) config: &'a DbConfig,
}

impl<E: Executor> Instrumented<'_, E> {
    pub(crate) async fn fetch_one<D>(
        &self,
        ctx: &Context,
        dest: &mut D,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<()>
    where
        D: ScanOne<E::Row> + Send + ?Sized,
    {
        let start = Start::now();
        let result = self
            .guarded(ctx, async {
                let mut rows = self.exec.query(sql, params).await?;
                // Only the first row is scanned; the rest of the cursor is dropped.
                match rows.next().await {
                    None => Err(DbError::NoRows),
                    Some(row) => dest.scan_row(&row?).map_err(DbError::Scan),
                }
            })
            .await;
        self.fire(ctx, start, QueryFunction::FetchOne, sql, params, &result);
        result
    }

    pub(crate) async fn fetch_many<D>(
        &self,
        ctx: &Context,
        dest: &mut D,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<()>
    where
        D: ScanMany<E::Row> + Send + ?Sized,
    {
        let start = Start::now();
        let result = self
            .guarded(ctx, async {
                let mut rows = self.exec.query(sql, params).await?;
                while let Some(row) = rows.next().await {
                    dest.scan_append_row(&row?).map_err(DbError::Scan)?;
                }
                Ok(())
            })
            .await;
        self.fire(ctx, start, QueryFunction::FetchMany, sql, params, &result);
        result
    }

    pub(crate) async fn execute(
        &self,
        ctx: &Context,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<E::ExecResult> {
        let start = Start::now();
        let result = self.guarded(ctx, self.exec.execute(sql, params)).await;
        self.fire(ctx, start, QueryFunction::Execute, sql, params, &result);
        result
    }

    /// Run `future` under the caller's context and the configured query timeout.
    pub(crate) async fn guarded<T, F>(&self, ctx: &Context, future: F) -> DbResult<T>
    where
        F: std::future::Future<Output = DbResult<T>>,
    {
        // Nothing reached the server yet, so there is nothing to cancel.
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        let result = ctx.run(self.config.query_timeout, future).await;
        if result.as_ref().is_err_and(DbError::is_interrupted) {
            self.exec.cancel_in_flight();
        }
        result
    }

    fn fire<T>(
        &self,
        ctx: &Context,
        start: Start,
        function: QueryFunction,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
        result: &DbResult<T>,
    ) {
        let details = QueryDetails {
            start_time: start.wall,
            duration: start.clock.elapsed(),
            function,
            query_type: QueryType::from_sql(sql),
            query: sql,
            params,
        };
        self.hooks.dispatch(ctx, &details, result.as_ref().err());
    }
}

#[derive(Clone, Copy)]
struct Start {
    wall: SystemTime,
    clock: Instant,
}

impl Start {
    fn now() -> Self {
        Self {
            wall: SystemTime::now(),
            clock: Instant::now(),
        }
    }
}
