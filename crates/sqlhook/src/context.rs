//! Caller context: cancellation, deadlines and annotations for a call.
//!
//! Every facade operation takes a [`Context`]. The operation aborts promptly when the
//! context is cancelled or its deadline passes, and the same context is handed to every
//! hook so observers can read the caller's tag and fields.
//!
//! # Example
//!
//! ```ignore
//! use sqlhook::Context;
//! use std::time::Duration;
//!
//! let (ctx, cancel) = Context::background()
//!     .with_timeout(Duration::from_secs(5))
//!     .with_tag("load-user")
//!     .with_cancel();
//!
//! // From another task: cancel.cancel();
//! db.fetch_one(&ctx, &mut user, "SELECT * FROM users WHERE id = $1", &[&id]).await?;
//! ```

use crate::error::{DbError, DbResult};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Per-call context carrying cancellation, an optional deadline, and annotations.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: Vec<watch::Receiver<bool>>,
    tag: Option<String>,
    fields: BTreeMap<String, String>,
}

/// Cancels every [`Context`] derived from the one it was created with.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Context {
    /// A context with no deadline, no cancellation and no annotations.
    pub fn background() -> Self {
        Self::default()
    }

    /// Bound the context by a timeout from now.
    ///
    /// An existing earlier deadline is kept.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Bound the context by an absolute deadline.
    ///
    /// An existing earlier deadline is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// Derive a cancellable context.
    ///
    /// Cancelling the returned handle cancels this context and all of its clones. A
    /// context that was already cancellable stays cancelled by its original handle too.
    pub fn with_cancel(mut self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        self.cancel.push(rx);
        (self, CancelHandle { tx: Arc::new(tx) })
    }

    /// Attach a tag identifying the call site (e.g. `"load-user"`).
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Attach a low-cardinality structured field for hooks.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The tag, if any.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// All structured fields.
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// A single structured field.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Whether cancellation was signalled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.iter().any(|rx| *rx.borrow())
    }

    /// The interruption error if the context is already done, `None` otherwise.
    pub fn err(&self) -> Option<DbError> {
        if self.is_cancelled() {
            Some(DbError::Cancelled)
        } else if self.deadline.is_some_and(|d| d <= Instant::now()) {
            Some(DbError::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> DbError {
        let cancelled = async {
            let mut waits: Vec<_> = self
                .cancel
                .iter()
                .cloned()
                .map(|mut rx| Box::pin(async move { rx.wait_for(|c| *c).await.is_ok() }))
                .collect();
            while !waits.is_empty() {
                let (fired, _, rest) = futures_util::future::select_all(waits).await;
                if fired {
                    return;
                }
                // That handle was dropped without cancelling.
                waits = rest;
            }
            std::future::pending::<()>().await
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => DbError::Cancelled,
            _ = expired => DbError::DeadlineExceeded,
        }
    }

    /// Run `future` bounded by this context and an optional extra timeout.
    pub(crate) async fn run<T, F>(&self, timeout: Option<Duration>, future: F) -> DbResult<T>
    where
        F: Future<Output = DbResult<T>>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }

        let limit = async {
            match timeout {
                Some(timeout) => {
                    tokio::time::sleep(timeout).await;
                    DbError::Timeout(timeout)
                }
                None => std::future::pending().await,
            }
        };

        tokio::pin!(future);
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            err = limit => Err(err),
            result = &mut future => result,
        }
    }
}
