//! In-memory database for exercising the pipeline without a server.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::db::Database;

/// A statement the recording database executed successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedStatement {
    pub sql: String,
    pub args: Vec<String>,
}

#[derive(Debug, Default)]
struct Inner {
    executed: Mutex<Vec<ExecutedStatement>>,
    failed: Mutex<Vec<ExecutedStatement>>,
    prepared: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

/// Records every statement it is asked to run.
///
/// Failures can be injected at prepare time (every prepare fails) or at
/// execute time (any statement binding a given value fails). The affected
/// row count reported for a statement is its number of value groups.
#[derive(Debug, Clone, Default)]
pub struct RecordingDatabase {
    inner: Arc<Inner>,
    fail_prepare: bool,
    fail_value: Option<String>,
    latency: Option<Duration>,
}

impl RecordingDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_prepare(mut self) -> Self {
        self.fail_prepare = true;
        self
    }

    pub fn fail_execute_when_arg(mut self, value: &str) -> Self {
        self.fail_value = Some(value.to_string());
        self
    }

    /// Hold every execute for `latency` so executions overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn executed(&self) -> Vec<ExecutedStatement> {
        self.inner.executed.lock().clone()
    }

    pub fn failed(&self) -> Vec<ExecutedStatement> {
        self.inner.failed.lock().clone()
    }

    pub fn prepared_count(&self) -> usize {
        self.inner.prepared.load(Ordering::SeqCst)
    }

    /// Highest number of executes observed running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }
}

impl Database for RecordingDatabase {
    type Prepared = String;

    async fn prepare(&self, sql: &str) -> Result<String, sqlx::Error> {
        if self.fail_prepare {
            return Err(sqlx::Error::Protocol(format!("cannot prepare: {sql}")));
        }
        self.inner.prepared.fetch_add(1, Ordering::SeqCst);
        Ok(sql.to_string())
    }

    async fn execute(&self, sql: String, args: Vec<String>) -> Result<u64, sqlx::Error> {
        let active = self.inner.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak.fetch_max(active, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let groups = sql.matches('(').count().saturating_sub(1) as u64;
        let statement = ExecutedStatement { sql, args };
        let fails = self
            .fail_value
            .as_ref()
            .is_some_and(|bad| statement.args.contains(bad));

        self.inner.active.fetch_sub(1, Ordering::SeqCst);

        if fails {
            self.inner.failed.lock().push(statement);
            return Err(sqlx::Error::Protocol("duplicate entry".to_string()));
        }

        self.inner.executed.lock().push(statement);
        Ok(groups)
    }
}
