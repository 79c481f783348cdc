use crate::context::Context;
use crate::error::DbError;
use crate::statement::QueryType;
use std::fmt;
use std::time::{Duration, SystemTime};
use tokio_postgres::types::ToSql;

/// The facade operation that produced a query envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryFunction {
    /// Single-row fetch.
    FetchOne,
    /// Multi-row fetch.
    FetchMany,
    /// Non-row-returning statement.
    Execute,
}

impl QueryFunction {
    /// Stable name, suitable as a metrics label.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryFunction::FetchOne => "fetch_one",
            QueryFunction::FetchMany => "fetch_many",
            QueryFunction::Execute => "execute",
        }
    }
}

impl fmt::Display for QueryFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The envelope handed to hooks once a query-shaped operation has finished.
///
/// Built fresh for every call and dropped after the hooks ran. Hooks only ever see it by
/// shared reference.
#[derive(Debug, Clone, Copy)]
pub struct QueryDetails<'q> {
    /// Wall-clock time the operation started.
    pub start_time: SystemTime,
    /// Time from the start of the call until the operation completed, row scanning included.
    pub duration: Duration,
    /// The facade operation.
    pub function: QueryFunction,
    /// Statement kind detected from the query text.
    pub query_type: QueryType,
    /// The query text, as passed by the caller.
    pub query: &'q str,
    /// The query parameters, in order.
    pub params: &'q [&'q (dyn ToSql + Sync)],
}

impl QueryDetails<'_> {
    /// Number of parameters.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }
}

/// Observer invoked after every fetch-one, fetch-many and execute call.
///
/// Hooks run synchronously, in registration order, before the operation returns to its
/// caller, on success and on failure alike. `outcome` is the operation's final error, or
/// `None` on success.
///
/// Hooks must not panic, and should not block: a slow hook delays the operation that
/// triggered it.
///
/// Closures with the matching signature implement this trait.
pub trait QueryHook: Send + Sync {
    /// Called once the operation finished.
    fn after_query(&self, ctx: &Context, details: &QueryDetails<'_>, outcome: Option<&DbError>);
}

impl<F> QueryHook for F
where
    F: Fn(&Context, &QueryDetails<'_>, Option<&DbError>) + Send + Sync,
{
    fn after_query(&self, ctx: &Context, details: &QueryDetails<'_>, outcome: Option<&DbError>) {
        self(ctx, details, outcome)
    }
}
