//! Pipeline driver.
//!
//! The BulkLoader runs the whole load:
//! 1. Read the header and resolve the effective columns once
//! 2. Read a batch of data rows
//! 3. Squash duplicates and build the batch's INSERT
//! 4. Take a connection slot and hand the statement to a worker
//! 5. Once input is exhausted, wait for every worker and report totals

use std::io::Read;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::LoadSettings;
use crate::db::Database;
use crate::error::{LoadError, LoadResult};
use crate::import::columns::ColumnPlan;
use crate::import::governor::ConnectionGovernor;
use crate::import::reader::{CsvSource, Input, Row, spawn_batch_reader};
use crate::import::stats::LoadStats;
use crate::import::status::spawn_status_reporter;
use crate::import::{dedup, statement, worker};

/// Coordinates a bounded-concurrency load of one source into one table.
pub struct BulkLoader<D: Database> {
    db: D,
    settings: Arc<LoadSettings>,
}

impl<D: Database> BulkLoader<D> {
    /// Create a loader writing through `db`.
    ///
    /// # Arguments
    /// * `db` - Database handle; its connection limit should equal `settings.concurrency`
    /// * `settings` - Validated run settings
    pub fn new(db: D, settings: LoadSettings) -> Self {
        Self {
            db,
            settings: Arc::new(settings),
        }
    }

    /// Load every record of `source`.
    ///
    /// Returns once all dispatched batches have finished. A fatal error
    /// (decode, prepare, strict row-shape, configuration) returns
    /// immediately; workers still in flight are aborted, not drained.
    pub async fn run<R>(&self, source: CsvSource<R>) -> LoadResult<LoadStats>
    where
        R: Read + Send + 'static,
    {
        let started = Instant::now();
        let settings = &self.settings;

        let (governor, accounting) = ConnectionGovernor::start(settings.concurrency);
        let shutdown = CancellationToken::new();
        let _stop_status = shutdown.clone().drop_guard();
        let status = spawn_status_reporter(
            governor.counters(),
            settings.status_interval,
            shutdown.clone(),
        );

        let (mut batches, reader) = spawn_batch_reader(source, settings.batch_size);
        let mut workers = JoinSet::new();
        let mut stats = LoadStats::default();

        log::info!(
            "loading into {} with {} connections, {} rows per batch",
            settings.table,
            governor.limit(),
            settings.batch_size
        );

        let header = match batches.recv().await.transpose()? {
            Some(Input::Header(header)) => header,
            Some(Input::Batch(_)) | None => {
                log::warn!("source is empty, nothing to load");
                return self.finish(stats, started, governor, accounting, status, shutdown).await;
            }
        };

        let plan = ColumnPlan::resolve(&header.fields, &settings.columns)?;
        statement::check_parameter_budget(settings.batch_size, &plan)?;
        log::debug!("effective header: {}", plan.columns().join(", "));

        let mut batch_id = 0u64;

        while let Some(input) = batches.recv().await {
            let Input::Batch(rows) = input? else {
                continue;
            };

            let Some(insert) = self.prepare_batch(rows, &plan, &mut stats)? else {
                continue;
            };

            // Surface fatal results from workers that already finished.
            while let Some(result) = workers.try_join_next() {
                result??;
            }

            batch_id += 1;
            let slot = governor.acquire(batch_id).await?;
            stats.batches_dispatched += 1;
            workers.spawn(worker::insert_batch(
                self.db.clone(),
                insert,
                slot,
                governor.counters(),
            ));
        }

        reader.await?;

        while let Some(result) = workers.join_next().await {
            result??;
        }

        self.finish(stats, started, governor, accounting, status, shutdown).await
    }

    /// Squash and build one batch; `None` when nothing is left to insert.
    fn prepare_batch(
        &self,
        rows: Vec<Row>,
        plan: &ColumnPlan,
        stats: &mut LoadStats,
    ) -> LoadResult<Option<statement::InsertStatement>> {
        let settings = &self.settings;
        stats.rows_read += rows.len() as u64;

        let squashed = dedup::squash(rows, settings.squash);
        stats.rows_squashed += squashed.dropped as u64;

        let insert = statement::build_insert(
            &settings.table,
            plan,
            &squashed.rows,
            settings.dialect,
            settings.shape,
        )?;
        stats.rows_skipped += insert.skipped as u64;

        if insert.is_empty() {
            log::trace!("batch filtered down to zero rows, not dispatched");
            return Ok(None);
        }
        Ok(Some(insert))
    }

    async fn finish(
        &self,
        mut stats: LoadStats,
        started: Instant,
        governor: ConnectionGovernor,
        accounting: crate::import::governor::AccountingHandle,
        status: tokio::task::JoinHandle<()>,
        shutdown: CancellationToken,
    ) -> LoadResult<LoadStats> {
        drop(governor);
        let counters = accounting.await.map_err(LoadError::from)?;
        stats.merge_counters(counters);
        stats.elapsed = started.elapsed();

        shutdown.cancel();
        status.await?;

        log::info!("status: {} insertions", stats.batches_completed);
        log::info!("execution time: {:?}", stats.elapsed);
        Ok(stats)
    }
}
