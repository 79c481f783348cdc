use super::types::{QueryDetails, QueryFunction, QueryHook};
use crate::context::Context;
use crate::error::DbError;
use crate::statement::QueryType;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// A hook that tracks query statistics.
#[derive(Debug, Default)]
pub struct StatsHook {
    total_queries: AtomicU64,
    failed_queries: AtomicU64,
    no_rows: AtomicU64,
    fetch_one_count: AtomicU64,
    fetch_many_count: AtomicU64,
    execute_count: AtomicU64,
    select_count: AtomicU64,
    insert_count: AtomicU64,
    update_count: AtomicU64,
    delete_count: AtomicU64,
    total_duration_nanos: AtomicU64,
    max_duration_nanos: AtomicU64,
    slowest_query: Mutex<Option<String>>,
}

/// Collected query statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Total number of queries observed.
    pub total_queries: u64,
    /// Queries that finished with an error other than "no rows".
    pub failed_queries: u64,
    /// Single-row fetches that matched no rows.
    pub no_rows: u64,
    /// Number of fetch-one calls.
    pub fetch_one_count: u64,
    /// Number of fetch-many calls.
    pub fetch_many_count: u64,
    /// Number of execute calls.
    pub execute_count: u64,
    /// Number of SELECT queries.
    pub select_count: u64,
    /// Number of INSERT statements.
    pub insert_count: u64,
    /// Number of UPDATE statements.
    pub update_count: u64,
    /// Number of DELETE statements.
    pub delete_count: u64,
    /// Total execution time.
    pub total_duration: Duration,
    /// Slowest query duration.
    pub max_duration: Duration,
    /// Slowest query SQL.
    pub slowest_query: Option<String>,
}

impl StatsHook {
    /// Create a new stats hook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of current statistics.
    pub fn stats(&self) -> QueryStats {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        QueryStats {
            total_queries: load(&self.total_queries),
            failed_queries: load(&self.failed_queries),
            no_rows: load(&self.no_rows),
            fetch_one_count: load(&self.fetch_one_count),
            fetch_many_count: load(&self.fetch_many_count),
            execute_count: load(&self.execute_count),
            select_count: load(&self.select_count),
            insert_count: load(&self.insert_count),
            update_count: load(&self.update_count),
            delete_count: load(&self.delete_count),
            total_duration: Duration::from_nanos(load(&self.total_duration_nanos)),
            max_duration: Duration::from_nanos(load(&self.max_duration_nanos)),
            slowest_query: self
                .slowest_query
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }

    /// Reset all statistics.
    pub fn reset(&self) {
        for counter in [
            &self.total_queries,
            &self.failed_queries,
            &self.no_rows,
            &self.fetch_one_count,
            &self.fetch_many_count,
            &self.execute_count,
            &self.select_count,
            &self.insert_count,
            &self.update_count,
            &self.delete_count,
            &self.total_duration_nanos,
            &self.max_duration_nanos,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        *self
            .slowest_query
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn function_counter(&self, function: QueryFunction) -> &AtomicU64 {
        match function {
            QueryFunction::FetchOne => &self.fetch_one_count,
            QueryFunction::FetchMany => &self.fetch_many_count,
            QueryFunction::Execute => &self.execute_count,
        }
    }

    fn type_counter(&self, query_type: QueryType) -> Option<&AtomicU64> {
        match query_type {
            QueryType::Select => Some(&self.select_count),
            QueryType::Insert => Some(&self.insert_count),
            QueryType::Update => Some(&self.update_count),
            QueryType::Delete => Some(&self.delete_count),
            QueryType::Other => None,
        }
    }
}

impl QueryHook for StatsHook {
    fn after_query(&self, _ctx: &Context, details: &QueryDetails<'_>, outcome: Option<&DbError>) {
        let duration_nanos = u64::try_from(details.duration.as_nanos()).unwrap_or(u64::MAX);

        self.total_queries.fetch_add(1, Ordering::Relaxed);
        self.function_counter(details.function)
            .fetch_add(1, Ordering::Relaxed);
        if let Some(counter) = self.type_counter(details.query_type) {
            counter.fetch_add(1, Ordering::Relaxed);
        }

        match outcome {
            None => {}
            Some(DbError::NoRows) => {
                self.no_rows.fetch_add(1, Ordering::Relaxed);
            }
            Some(_) => {
                self.failed_queries.fetch_add(1, Ordering::Relaxed);
            }
        }

        let prev_total = self
            .total_duration_nanos
            .fetch_add(duration_nanos, Ordering::Relaxed);
        if prev_total.checked_add(duration_nanos).is_none() {
            // Saturate instead of wrapping.
            self.total_duration_nanos.store(u64::MAX, Ordering::Relaxed);
        }

        let mut current_max = self.max_duration_nanos.load(Ordering::Relaxed);
        while duration_nanos > current_max {
            match self.max_duration_nanos.compare_exchange_weak(
                current_max,
                duration_nanos,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    *self
                        .slowest_query
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner) = Some(details.query.to_string());
                    break;
                }
                Err(updated) => current_max = updated,
            }
        }
    }
}
