//! Background idle-session sweeper.
//!
//! A tokio task that calls [`SessionStore::sweep`] on a fixed interval until
//! told to stop through a `watch` channel.

use crate::session::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<u64>,
}

impl SweeperHandle {
    /// Signal the task and wait for it to exit. Returns the total number of
    /// sessions it removed.
    ///
    /// A sweep already in progress finishes before the task observes the signal.
    pub async fn stop(self) -> u64 {
        let _ = self.shutdown_tx.send(true);
        match self.task.await {
            Ok(total) => total,
            Err(e) => {
                tracing::warn!(error = %e, "session_sweeper_join_failed");
                0
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawn the sweeper on the current tokio runtime.
///
/// The first sweep happens one `interval` after spawning.
pub fn spawn(
    store: Arc<SessionStore>,
    interval: Duration,
    idle_timeout: Duration,
) -> SweeperHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut total: u64 = 0;

        tracing::info!(
            interval_secs = interval.as_secs_f64(),
            idle_timeout_secs = idle_timeout.as_secs(),
            "session_sweeper_started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = store.sweep(idle_timeout);
                    total += removed as u64;
                    if removed > 0 {
                        tracing::debug!(
                            removed,
                            remaining = store.count(),
                            "session_sweep_completed"
                        );
                    }
                }
                changed = shutdown_rx.changed() => {
                    // A dropped sender also means stop.
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!(total_removed = total, "session_sweeper_stopped");
        total
    });

    SweeperHandle { shutdown_tx, task }
}
