//! Load statistics.
//!
//! Tracks what happened to the rows of one run, from decoding to the final
//! database acknowledgement.

use std::fmt;
use std::time::Duration;

use crate::import::governor::RunCounters;

/// Summary of a finished load run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Data rows decoded (the header is not counted)
    pub rows_read: u64,
    /// Rows dropped as duplicates within their batch
    pub rows_squashed: u64,
    /// Rows left out because their width did not match the header
    pub rows_skipped: u64,
    /// Rows the database reported as affected
    pub rows_inserted: u64,
    /// Statements handed to workers
    pub batches_dispatched: u64,
    /// Workers that released their slot, whatever the outcome
    pub batches_completed: u64,
    /// Batches whose execution failed and were abandoned
    pub batches_failed: u64,
    pub elapsed: Duration,
}

impl LoadStats {
    /// Fold the accounting task's final counters into the driver's totals.
    pub fn merge_counters(&mut self, counters: RunCounters) {
        self.batches_completed += counters.completed;
        self.batches_failed += counters.failed + counters.abandoned;
        self.rows_inserted += counters.rows_inserted;
    }
}

impl fmt::Display for LoadStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} batches completed ({} failed), {} rows read, {} inserted, {} squashed, {} skipped",
            self.batches_completed,
            self.batches_failed,
            self.rows_read,
            self.rows_inserted,
            self.rows_squashed,
            self.rows_skipped
        )
    }
}
