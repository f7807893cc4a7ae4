//! Periodic eviction of expired rules
//!
//! The sweeper works through the same [`RuleStore`] as request handlers and
//! holds no lock across its list-then-delete sequence. A rule removed by
//! someone else between the two steps is simply counted as already gone.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::store::RuleStore;

/// Outcome of a single sweep tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Rules examined
    pub scanned: usize,
    /// Rules whose lifetime had elapsed
    pub expired: usize,
    /// Expired rules this tick actually removed
    pub removed: usize,
    /// Deletes that failed; retried naturally on the next tick
    pub failed: usize,
}

pub struct Sweeper<S> {
    store: Arc<S>,
    period: Duration,
}

impl<S: RuleStore> Sweeper<S> {
    pub fn new(store: Arc<S>, period: Duration) -> Self {
        Self { store, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Runs one tick as of `now`.
    ///
    /// Storage failures are logged, never returned: a failed list yields an
    /// empty report and a failed delete does not stop the remaining rules.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> SweepReport {
        debug!("Looking for expired rules");

        let rules = match self.store.list().await {
            Ok(rules) => rules,
            Err(e) => {
                warn!("Unable to retrieve rules: {e}");
                return SweepReport::default();
            }
        };

        let mut report = SweepReport {
            scanned: rules.len(),
            ..SweepReport::default()
        };

        for rule in rules.iter().filter(|rule| rule.is_expired(now)) {
            report.expired += 1;
            match self.store.delete(rule.id).await {
                Ok(true) => {
                    report.removed += 1;
                    info!(id = %rule.id, name = %rule.name, "Expired rule removed");
                }
                Ok(false) => {
                    debug!(id = %rule.id, "Expired rule already removed");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(id = %rule.id, "Error deleting expired rule: {e}");
                }
            }
        }

        report
    }

    /// Ticks every `period` until `shutdown` changes or its sender is dropped.
    ///
    /// Ticks never overlap; a slow tick delays the next one instead of
    /// queueing a burst.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(period_ms = self.period.as_millis(), "Expiration sweeper started");

        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow_and_update() {
                        break;
                    }
                }

                _ = interval.tick() => {
                    let report = self.sweep_once(Utc::now()).await;
                    if report.expired > 0 {
                        debug!(?report, "Sweep finished");
                    }
                }
            }
        }

        info!("Expiration sweeper stopped");
    }

    /// Starts the sweeper on the current tokio runtime.
    pub fn spawn(self) -> SweeperHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        SweeperHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Owner of a running sweeper task
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signals shutdown and waits for the in-flight tick to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!("Sweeper task ended abnormally: {e}");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
