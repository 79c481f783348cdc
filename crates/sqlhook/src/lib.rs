//! # sqlhook
//!
//! An instrumentation facade for PostgreSQL clients.
//!
//! ## Features
//!
//! - **Uniform surface**: `fetch_one` / `fetch_many` / `execute` on connections ([`Db`]) and
//!   transactions ([`Tx`]), unified by the [`Facade`] trait
//! - **Hooks on every query**: each call hands a [`QueryDetails`] envelope (timing, function,
//!   statement kind, SQL, parameters) and its outcome to every registered [`QueryHook`]
//! - **Shared registry**: transactions fire the hooks of the connection that started them,
//!   including hooks registered later
//! - **Explicit no-rows**: a single-row fetch that matches nothing returns [`DbError::NoRows`]
//! - **Cancellation**: every call takes a [`Context`] carrying a deadline and a cancel signal
//! - **Opaque scanning**: rows are handed to caller-supplied [`ScanOne`] / [`ScanMany`] destinations
//!
//! ## Example
//!
//! ```ignore
//! use sqlhook::{Context, Db, FromRow, PgConnector, StatsHook};
//! use std::sync::Arc;
//!
//! let ctx = Context::background();
//! let mut db = Db::connect(&ctx, &PgConnector::no_tls(), &database_url).await?;
//!
//! let stats = Arc::new(StatsHook::new());
//! db.hooks().register_arc(stats.clone());
//! db.register_hook(sqlhook::TracingHook::new());
//!
//! let mut user: Option<User> = None;
//! db.fetch_one(&ctx, &mut user, "SELECT id, username FROM users WHERE id = $1", &[&1_i64])
//!     .await?;
//!
//! let tx = db.begin(&ctx).await?;
//! tx.execute(&ctx, "UPDATE users SET username = $1 WHERE id = $2", &[&"bob", &1_i64])
//!     .await?;
//! tx.commit(&ctx).await?;
//!
//! println!("{:?}", stats.stats());
//! ```

pub mod config;
pub mod context;
pub mod db;
pub mod driver;
pub mod error;
pub mod facade;
pub mod hook;
pub mod postgres;
pub mod scan;
pub mod statement;
pub mod transaction;

mod instrument;

pub use config::DbConfig;
pub use context::{CancelHandle, Context};
pub use db::Db;
pub use driver::{Connection, Connector, Executor, RowStream, TransactionHandle};
pub use error::{BoxError, ConnectTimeout, DbError, DbResult};
pub use facade::Facade;
pub use hook::{HookRegistry, QueryDetails, QueryFunction, QueryHook, QueryStats, StatsHook};
pub use postgres::PgConnector;
pub use scan::{ColumnDecodeError, FromRow, RowExt, ScanFn, ScanMany, ScanOne, scan_fn};
pub use statement::QueryType;
pub use transaction::{IsolationLevel, TransactionOptions, Tx};

#[cfg(feature = "tracing")]
pub use hook::TracingHook;
