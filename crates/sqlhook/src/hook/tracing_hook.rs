use super::truncate_sql_bytes;
use super::types::{QueryDetails, QueryHook};
use crate::context::Context;
use crate::error::DbError;
use std::time::Duration;
use tracing::Level;

/// A `tracing`-based hook that emits one event per finished query.
///
/// Events go to target `sqlhook.query`. Successful queries and "no rows" outcomes are
/// emitted at [`TracingHook::level`]; failures, and queries slower than the slow-query
/// threshold, are emitted at `WARN`.
///
/// Enable via the crate feature: `sqlhook = { features = ["tracing"] }` (on by default).
#[derive(Debug, Clone)]
pub struct TracingHook {
    /// Tracing event level for ordinary queries.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
    /// Include the `Debug` rendering of parameters. Off by default: parameters may hold
    /// personal data.
    pub log_params: bool,
    /// Queries at least this slow are emitted at `WARN`.
    pub slow_query_threshold: Option<Duration>,
}

impl Default for TracingHook {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
            log_params: false,
            slow_query_threshold: None,
        }
    }
}

impl TracingHook {
    /// Create a new hook with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    /// Include query parameters in events.
    pub fn with_params(mut self) -> Self {
        self.log_params = true;
        self
    }

    /// Escalate queries slower than `threshold` to `WARN`.
    pub fn slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    pub(crate) fn event_level(&self, details: &QueryDetails<'_>, outcome: Option<&DbError>) -> Level {
        let slow = self
            .slow_query_threshold
            .is_some_and(|threshold| details.duration >= threshold);
        match outcome {
            Some(DbError::NoRows) | None if !slow => self.level,
            _ => Level::WARN,
        }
    }
}

impl QueryHook for TracingHook {
    fn after_query(&self, ctx: &Context, details: &QueryDetails<'_>, outcome: Option<&DbError>) {
        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.truncate_sql(details.query);
        let tag = ctx.tag().unwrap_or("-");
        let fields = tracing::field::debug(ctx.fields());
        let params = self
            .log_params
            .then(|| tracing::field::debug(details.params));
        let error = outcome.map(tracing::field::display);
        let slow = self
            .slow_query_threshold
            .is_some_and(|threshold| details.duration >= threshold);

        emit_at_level!(
            self.event_level(details, outcome),
            target: "sqlhook.query",
            function = %details.function,
            query_type = %details.query_type,
            tag,
            duration = ?details.duration,
            slow,
            param_count = details.param_count(),
            params,
            sql = %sql,
            error,
            fields = fields,
            "query finished",
        );
    }
}
