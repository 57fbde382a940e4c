//! Connection slots and completion accounting.
//!
//! At most `limit` slots are held at any time. The driver takes a slot
//! before spawning a worker; the slot is handed back by a single accounting
//! task, which is also the only writer of [`RunCounters`]. Workers never
//! touch the counters: dropping their [`Slot`] queues one release event.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::{LoadError, LoadResult};

/// How a worker's batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Executed; carries the affected-row count reported by the database.
    Inserted(u64),
    /// Execution failed; the batch is abandoned.
    Failed,
    /// The worker stopped before executing (prepare failure, panic, abort).
    Abandoned,
}

/// Process-wide progress, owned by the accounting task.
///
/// Snapshots are published after every event; readers get a recent view
/// that is fine for display but carries no ordering guarantee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    /// Slots currently held by workers.
    pub in_flight: usize,
    /// Batches whose worker has released its slot, whatever the outcome.
    pub completed: u64,
    pub failed: u64,
    pub abandoned: u64,
    pub rows_inserted: u64,
}

#[derive(Debug)]
enum Event {
    Acquired,
    Released { batch_id: u64, outcome: BatchOutcome },
}

/// Admission control for insert workers.
pub struct ConnectionGovernor {
    permits: Arc<Semaphore>,
    events: mpsc::UnboundedSender<Event>,
    counters: watch::Receiver<RunCounters>,
    limit: usize,
}

/// Handle on the accounting task; resolves to the final counters once the
/// governor and every outstanding slot are gone.
pub type AccountingHandle = JoinHandle<RunCounters>;

impl ConnectionGovernor {
    /// Create a governor with `limit` free slots and start its accounting task.
    pub fn start(limit: usize) -> (Self, AccountingHandle) {
        let permits = Arc::new(Semaphore::new(limit));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (counters_tx, counters_rx) = watch::channel(RunCounters::default());

        let accounting = tokio::spawn(run_accounting(events_rx, permits.clone(), counters_tx));

        let governor = Self {
            permits,
            events: events_tx,
            counters: counters_rx,
            limit,
        };
        (governor, accounting)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Wait for a free slot and mark it held.
    pub async fn acquire(&self, batch_id: u64) -> LoadResult<Slot> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| LoadError::GovernorClosed)?;
        // Returned by the accounting task, not by dropping the permit.
        permit.forget();

        self.events
            .send(Event::Acquired)
            .map_err(|_| LoadError::GovernorClosed)?;

        Ok(Slot {
            batch_id,
            events: self.events.clone(),
            outcome: None,
        })
    }

    /// Live view of the counters.
    pub fn counters(&self) -> watch::Receiver<RunCounters> {
        self.counters.clone()
    }
}

/// One held connection slot. Released exactly once, when dropped.
#[derive(Debug)]
pub struct Slot {
    batch_id: u64,
    events: mpsc::UnboundedSender<Event>,
    outcome: Option<BatchOutcome>,
}

impl Slot {
    pub fn batch_id(&self) -> u64 {
        self.batch_id
    }

    /// Record how the batch ended; reported when the slot is released.
    pub fn finish(&mut self, outcome: BatchOutcome) {
        self.outcome = Some(outcome);
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        let outcome = self.outcome.take().unwrap_or(BatchOutcome::Abandoned);
        let released = self.events.send(Event::Released {
            batch_id: self.batch_id,
            outcome,
        });
        if released.is_err() {
            log::trace!("batch {}: accounting already stopped", self.batch_id);
        }
    }
}

async fn run_accounting(
    mut events: mpsc::UnboundedReceiver<Event>,
    permits: Arc<Semaphore>,
    publisher: watch::Sender<RunCounters>,
) -> RunCounters {
    let mut counters = RunCounters::default();

    while let Some(event) = events.recv().await {
        match event {
            Event::Acquired => {
                counters.in_flight += 1;
            }
            Event::Released { batch_id, outcome } => {
                counters.in_flight = counters.in_flight.saturating_sub(1);
                counters.completed += 1;
                match outcome {
                    BatchOutcome::Inserted(rows) => counters.rows_inserted += rows,
                    BatchOutcome::Failed => counters.failed += 1,
                    BatchOutcome::Abandoned => counters.abandoned += 1,
                }
                log::trace!("batch {} released: {:?}", batch_id, outcome);
                permits.add_permits(1);
            }
        }
        publisher.send_replace(counters);
    }

    counters
}
