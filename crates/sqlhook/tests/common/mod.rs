//! In-memory driver and recording helpers shared by the integration tests.

#![allow(dead_code)]

use sqlhook::{
    BoxError, Connection, Connector, Context, DbError, DbResult, Executor, FromRow, HookRegistry,
    QueryDetails, QueryFunction, QueryType, RowStream, ScanMany, ScanOne, TransactionHandle,
    TransactionOptions,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_postgres::types::ToSql;

#[derive(Debug, Clone, PartialEq)]
pub struct MockRow {
    pub id: i64,
    pub name: String,
}

pub fn row(id: i64, name: &str) -> MockRow {
    MockRow {
        id,
        name: name.to_string(),
    }
}

/// What the mock server answers, plus a log of what it was asked.
#[derive(Debug, Default)]
pub struct MockState {
    pub rows: Mutex<Vec<MockRow>>,
    pub affected: Mutex<u64>,
    pub query_error: Mutex<Option<String>>,
    pub ping_error: Mutex<Option<String>>,
    pub open_error: Mutex<Option<String>>,
    pub commit_error: Mutex<Option<String>>,
    pub delay: Mutex<Option<Duration>>,
    pub open_delay: Mutex<Option<Duration>>,
    pub ping_delay: Mutex<Option<Duration>>,
    pub commit_delay: Mutex<Option<Duration>>,
    pub cursor_error: Mutex<Option<(usize, String)>>,
    pub calls: Mutex<Vec<String>>,
    pub cancels: AtomicUsize,
}

impl MockState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_rows(&self, rows: Vec<MockRow>) {
        *self.rows.lock().unwrap() = rows;
    }

    pub fn set_affected(&self, affected: u64) {
        *self.affected.lock().unwrap() = affected;
    }

    pub fn fail_queries(&self, message: &str) {
        *self.query_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_ping(&self, message: &str) {
        *self.ping_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_open(&self, message: &str) {
        *self.open_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_commit(&self, message: &str) {
        *self.commit_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn delay_by(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Make `open` hang for `delay` before answering.
    pub fn delay_open(&self, delay: Duration) {
        *self.open_delay.lock().unwrap() = Some(delay);
    }

    pub fn delay_ping(&self, delay: Duration) {
        *self.ping_delay.lock().unwrap() = Some(delay);
    }

    pub fn delay_commit(&self, delay: Duration) {
        *self.commit_delay.lock().unwrap() = Some(delay);
    }

    /// Make the row cursor yield `rows` rows and then a driver error.
    pub fn fail_cursor_after(&self, rows: usize, message: &str) {
        *self.cursor_error.lock().unwrap() = Some((rows, message.to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    async fn pause(delay: &Mutex<Option<Duration>>) {
        let delay = *delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    async fn respond<T>(&self, answer: impl FnOnce(&Self) -> T) -> DbResult<T> {
        Self::pause(&self.delay).await;
        let error = self.query_error.lock().unwrap().clone();
        match error {
            Some(message) => Err(DbError::query(message)),
            None => Ok(answer(self)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockConnector {
    pub state: Arc<MockState>,
}

impl MockConnector {
    pub fn new(state: &Arc<MockState>) -> Self {
        Self {
            state: state.clone(),
        }
    }
}

impl Connector for MockConnector {
    type Connection = MockConn;

    async fn open(&self, dsn: &str) -> DbResult<MockConn> {
        self.state.record(format!("open {dsn}"));
        MockState::pause(&self.state.open_delay).await;
        let error = self.state.open_error.lock().unwrap().clone();
        match error {
            Some(message) => Err(DbError::connection(message)),
            None => Ok(MockConn {
                state: self.state.clone(),
            }),
        }
    }
}

#[derive(Debug)]
pub struct MockConn {
    pub state: Arc<MockState>,
}

impl MockConn {
    pub fn new(state: &Arc<MockState>) -> Self {
        Self {
            state: state.clone(),
        }
    }
}

impl Executor for MockConn {
    type Row = MockRow;
    type ExecResult = u64;

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<RowStream<MockRow>> {
        self.state.record(format!("query {sql} ({} params)", params.len()));
        let rows = self.state.respond(|s| s.rows.lock().unwrap().clone()).await?;
        let cursor_error = self.state.cursor_error.lock().unwrap().clone();
        match cursor_error {
            None => Ok(RowStream::from_rows(rows)),
            Some((after, message)) => {
                let items: Vec<DbResult<MockRow>> = rows
                    .into_iter()
                    .take(after)
                    .map(Ok)
                    .chain(std::iter::once(Err(DbError::query(message))))
                    .collect();
                Ok(RowStream::new(futures_util::stream::iter(items)))
            }
        }
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        self.state.record(format!("execute {sql} ({} params)", params.len()));
        self.state.respond(|s| *s.affected.lock().unwrap()).await
    }

    fn cancel_in_flight(&self) {
        self.state.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

impl Connection for MockConn {
    type Transaction<'c> = MockTx<'c>;

    async fn ping(&self) -> DbResult<()> {
        self.state.record("ping");
        MockState::pause(&self.state.ping_delay).await;
        let error = self.state.ping_error.lock().unwrap().clone();
        match error {
            // A driver reports a failed round trip however it likes; the facade reclassifies it.
            Some(message) => Err(DbError::query(message)),
            None => Ok(()),
        }
    }

    async fn begin(&mut self, options: Option<&TransactionOptions>) -> DbResult<MockTx<'_>> {
        self.state.record(match options {
            Some(options) => format!("begin {options:?}"),
            None => "begin".to_string(),
        });
        Ok(MockTx { conn: self })
    }
}

#[derive(Debug)]
pub struct MockTx<'c> {
    conn: &'c mut MockConn,
}

impl Executor for MockTx<'_> {
    type Row = MockRow;
    type ExecResult = u64;

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<RowStream<MockRow>> {
        Executor::query(&*self.conn, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        Executor::execute(&*self.conn, sql, params).await
    }

    fn cancel_in_flight(&self) {
        self.conn.cancel_in_flight();
    }
}

impl TransactionHandle for MockTx<'_> {
    async fn commit(self) -> DbResult<()> {
        self.conn.state.record("commit");
        MockState::pause(&self.conn.state.commit_delay).await;
        let error = self.conn.state.commit_error.lock().unwrap().clone();
        match error {
            Some(message) => Err(DbError::transaction(message)),
            None => Ok(()),
        }
    }

    async fn rollback(self) -> DbResult<()> {
        self.conn.state.record("rollback");
        Ok(())
    }
}

/// A scan destination that counts calls and can be told to fail on the n-th one.
#[derive(Debug, Default)]
pub struct CountingScanner {
    pub calls: usize,
    pub fail_on: Option<usize>,
    pub seen: Vec<MockRow>,
}

impl CountingScanner {
    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on: Some(call),
            ..Self::default()
        }
    }

    fn scan(&mut self, row: &MockRow) -> Result<(), BoxError> {
        self.calls += 1;
        if self.fail_on == Some(self.calls) {
            return Err(format!("cannot scan row {}", row.id).into());
        }
        self.seen.push(row.clone());
        Ok(())
    }
}

impl ScanOne<MockRow> for CountingScanner {
    fn scan_row(&mut self, row: &MockRow) -> Result<(), BoxError> {
        self.scan(row)
    }
}

impl ScanMany<MockRow> for CountingScanner {
    fn scan_append_row(&mut self, row: &MockRow) -> Result<(), BoxError> {
        self.scan(row)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
}

impl FromRow<MockRow> for User {
    fn from_row(row: &MockRow) -> Result<Self, BoxError> {
        Ok(Self {
            id: row.id,
            name: row.name.clone(),
        })
    }
}

/// One hook invocation as seen by a recording hook.
#[derive(Debug, Clone, PartialEq)]
pub struct Fired {
    pub hook: usize,
    pub function: QueryFunction,
    pub query_type: QueryType,
    pub query: String,
    pub params: usize,
    pub outcome: Option<String>,
    pub tag: Option<String>,
}

pub type FiredLog = Arc<Mutex<Vec<Fired>>>;

/// Register `count` recording hooks, numbered from `first`, that append to `log`.
pub fn record_hooks(registry: &HookRegistry, log: &FiredLog, first: usize, count: usize) {
    for hook in first..first + count {
        let log = log.clone();
        registry.register_fn(
            move |ctx: &Context, details: &QueryDetails<'_>, outcome: Option<&DbError>| {
                log.lock().unwrap().push(Fired {
                    hook,
                    function: details.function,
                    query_type: details.query_type,
                    query: details.query.to_string(),
                    params: details.param_count(),
                    outcome: outcome.map(ToString::to_string),
                    tag: ctx.tag().map(str::to_string),
                });
            },
        );
    }
}

pub fn fired(log: &FiredLog) -> Vec<Fired> {
    log.lock().unwrap().clone()
}

pub fn hook_ids(log: &FiredLog) -> Vec<usize> {
    fired(log).iter().map(|f| f.hook).collect()
}
