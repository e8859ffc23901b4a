//! Background expiry sweep.
//!
//! Runs [`SessionLifecycleService::sweep_expired`] on a fixed interval,
//! independent of request traffic.  Ticks that fall behind are skipped, and
//! the service's sweep guard keeps it from overlapping a touch-triggered
//! sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::lifecycle::SessionLifecycleService;

/// Handle to a running sweeper task.
pub struct Sweeper {
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn the sweep loop on the current tokio runtime.
    pub fn spawn(service: Arc<SessionLifecycleService>, period: Duration) -> Self {
        let shutdown = Arc::new(Notify::new());
        let stop = shutdown.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = stop.notified() => break,
                    _ = interval.tick() => {
                        match service.sweep_expired(Utc::now()) {
                            0 => {}
                            n => tracing::info!(expired = n, "background sweep evicted sessions"),
                        }
                    }
                }
            }
        });
        tracing::info!(period_sec = period.as_secs(), "session sweeper started");
        Self { shutdown, handle }
    }

    /// Signal the loop to exit and wait for it.  A sweep in progress
    /// finishes first.
    pub async fn stop(self) {
        // notify_one stores a permit, so a signal sent mid-sweep is not lost.
        self.shutdown.notify_one();
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "session sweeper task failed");
        }
        tracing::info!("session sweeper stopped");
    }
}
