//! Executes one batch on its own freshly prepared statement.
//!
//! Each worker prepares its own statement instead of sharing one across
//! workers, paying one extra round trip per batch so concurrent workers
//! never contend on statement state.

use tokio::sync::watch;

use crate::db::Database;
use crate::error::{LoadError, LoadResult};
use crate::import::governor::{BatchOutcome, RunCounters, Slot};
use crate::import::statement::InsertStatement;

/// Prepare and execute `statement`, releasing `slot` on every path.
///
/// A prepare failure is returned as an error and ends the run. An execute
/// failure is logged and counted; it does not propagate.
pub async fn insert_batch<D: Database>(
    db: D,
    statement: InsertStatement,
    mut slot: Slot,
    counters: watch::Receiver<RunCounters>,
) -> LoadResult<()> {
    let batch_id = slot.batch_id();

    let prepared = db
        .prepare(&statement.sql)
        .await
        .map_err(|source| LoadError::Prepare { batch_id, source })?;

    match db.execute(prepared, statement.args).await {
        Ok(affected) => {
            log::trace!(
                "batch {}: {} rows sent, {} affected",
                batch_id,
                statement.rows,
                affected
            );
            slot.finish(BatchOutcome::Inserted(affected));
        }
        Err(err) => {
            let in_flight = counters.borrow().in_flight;
            log::warn!("batch {} ({} conns): {}", batch_id, in_flight, err);
            slot.finish(BatchOutcome::Failed);
        }
    }

    Ok(())
}
