//! Periodic progress line.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::import::governor::RunCounters;

/// Log completed batches and in-flight connections every `period` until
/// `shutdown` is cancelled.
pub fn spawn_status_reporter(
    counters: watch::Receiver<RunCounters>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick fires immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    log::trace!("status reporter stopped");
                    return;
                }

                _ = ticker.tick() => {
                    let snapshot = *counters.borrow();
                    log::info!(
                        "status: {} batches completed, {} database connections",
                        snapshot.completed,
                        snapshot.in_flight
                    );
                }
            }
        }
    })
}
