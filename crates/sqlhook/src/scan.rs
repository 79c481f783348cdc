//! Row scanning capabilities consumed by the facades.
//!
//! The facades never look inside a row. They hand each row to a caller-supplied
//! destination through one of two narrow traits:
//! - [`ScanOne`]: consume exactly one row (used by `fetch_one`)
//! - [`ScanMany`]: consume one row and append it, called repeatedly (used by `fetch_many`)
//!
//! Both are generic over the driver's row type. Ready-made destinations:
//! - `Option<T>` is a [`ScanOne`] and `Vec<T>` a [`ScanMany`] for any `T: FromRow<R>`
//! - [`scan_fn`] turns a closure into both
//!
//! # Example
//!
//! ```ignore
//! use sqlhook::{BoxError, FromRow, RowExt};
//!
//! struct User {
//!     id: i64,
//!     username: String,
//! }
//!
//! impl FromRow<tokio_postgres::Row> for User {
//!     fn from_row(row: &tokio_postgres::Row) -> Result<Self, BoxError> {
//!         Ok(Self {
//!             id: row.try_get_column("id")?,
//!             username: row.try_get_column("username")?,
//!         })
//!     }
//! }
//!
//! let mut users: Vec<User> = Vec::new();
//! db.fetch_many(&ctx, &mut users, "SELECT id, username FROM users", &[]).await?;
//! ```

use crate::error::BoxError;
use thiserror::Error;
use tokio_postgres::Row;

/// Consume exactly one row into a destination.
pub trait ScanOne<R> {
    /// Scan the row. An error becomes the operation's `DbError::Scan`.
    fn scan_row(&mut self, row: &R) -> Result<(), BoxError>;
}

/// Consume one row into an accumulating destination. Called once per row, in order.
pub trait ScanMany<R> {
    /// Scan the row and append it. An error stops the fetch.
    fn scan_append_row(&mut self, row: &R) -> Result<(), BoxError>;
}

/// Trait for converting a database row into a Rust value.
pub trait FromRow<R>: Sized {
    /// Convert a database row into Self
    fn from_row(row: &R) -> Result<Self, BoxError>;
}

impl<R, T: FromRow<R>> ScanOne<R> for Option<T> {
    fn scan_row(&mut self, row: &R) -> Result<(), BoxError> {
        *self = Some(T::from_row(row)?);
        Ok(())
    }
}

impl<R, T: FromRow<R>> ScanMany<R> for Vec<T> {
    fn scan_append_row(&mut self, row: &R) -> Result<(), BoxError> {
        self.push(T::from_row(row)?);
        Ok(())
    }
}

impl<R, S: ScanOne<R> + ?Sized> ScanOne<R> for &mut S {
    fn scan_row(&mut self, row: &R) -> Result<(), BoxError> {
        (**self).scan_row(row)
    }
}

impl<R, S: ScanMany<R> + ?Sized> ScanMany<R> for &mut S {
    fn scan_append_row(&mut self, row: &R) -> Result<(), BoxError> {
        (**self).scan_append_row(row)
    }
}

/// A scanner backed by a closure. See [`scan_fn`].
#[derive(Debug, Clone)]
pub struct ScanFn<F>(pub F);

/// Adapt a closure into a [`ScanOne`] and [`ScanMany`] destination.
///
/// ```ignore
/// let mut total = 0_i64;
/// db.fetch_many(&ctx, &mut scan_fn(|row: &Row| {
///     total += row.try_get::<_, i64>("amount")?;
///     Ok(())
/// }), "SELECT amount FROM payments", &[]).await?;
/// ```
pub fn scan_fn<R, F>(f: F) -> ScanFn<F>
where
    F: FnMut(&R) -> Result<(), BoxError>,
{
    ScanFn(f)
}

impl<R, F> ScanOne<R> for ScanFn<F>
where
    F: FnMut(&R) -> Result<(), BoxError>,
{
    fn scan_row(&mut self, row: &R) -> Result<(), BoxError> {
        (self.0)(row)
    }
}

impl<R, F> ScanMany<R> for ScanFn<F>
where
    F: FnMut(&R) -> Result<(), BoxError>,
{
    fn scan_append_row(&mut self, row: &R) -> Result<(), BoxError> {
        (self.0)(row)
    }
}

/// A column could not be decoded from a PostgreSQL row.
#[derive(Debug, Error)]
#[error("Decode error on column '{column}': {source}")]
pub struct ColumnDecodeError {
    /// The column name.
    pub column: String,
    /// The driver's decode error.
    #[source]
    pub source: tokio_postgres::Error,
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, naming the column on failure
    fn try_get_column<T>(&self, column: &str) -> Result<T, ColumnDecodeError>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> Result<T, ColumnDecodeError>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>,
    {
        self.try_get(column).map_err(|source| ColumnDecodeError {
            column: column.to_string(),
            source,
        })
    }
}
