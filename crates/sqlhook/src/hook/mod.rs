//! Query hooks: the observers invoked after every query-shaped operation.
//!
//! This module provides:
//! - [`QueryHook`], the observer trait (closures implement it too)
//! - [`QueryDetails`], the per-call envelope handed to hooks
//! - [`HookRegistry`], the shared, append-only list of hooks
//! - bundled hooks for statistics ([`StatsHook`]) and `tracing` events (`TracingHook`)
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlhook::{Context, Db, DbError, PgConnector, QueryDetails, StatsHook};
//! use std::sync::Arc;
//!
//! let db = Db::connect(&Context::background(), &PgConnector::no_tls(), &url).await?;
//!
//! // Closures are hooks.
//! db.register_hook_fn(|ctx: &Context, details: &QueryDetails<'_>, outcome: Option<&DbError>| {
//!     eprintln!("[{}] {} took {:?}: {:?}", ctx.tag().unwrap_or("-"), details.query, details.duration, outcome);
//! });
//!
//! // So are the bundled ones.
//! let stats = Arc::new(StatsHook::new());
//! db.hooks().register_arc(stats.clone());
//! ```

mod registry;
mod stats;
mod types;

#[cfg(feature = "tracing")]
mod tracing_hook;


pub use registry::HookRegistry;
pub use stats::{QueryStats, StatsHook};
pub use types::{QueryDetails, QueryFunction, QueryHook};

#[cfg(feature = "tracing")]
pub use tracing_hook::TracingHook;

#[cfg_attr(not(feature = "tracing"), allow(dead_code))]
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
