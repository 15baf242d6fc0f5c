//! Background worker that keeps the job list fresh.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::reconcile::{RefreshMode, RefreshSink};

/// Polls the backend: one initial refresh on start, then one background
/// refresh per interval until stopped.
pub struct PollWorker {
    refresher: Arc<dyn RefreshSink>,
    interval: Duration,
}

impl PollWorker {
    pub fn new(refresher: Arc<dyn RefreshSink>, interval: Duration) -> Self {
        Self {
            refresher,
            interval,
        }
    }

    /// Spawn the polling loop.
    pub fn start(self) -> PollHandle {
        let shutdown = Arc::new(Notify::new());
        let refresher = self.refresher.clone();
        let interval = self.interval;

        let task = tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                tracing::info!(interval_secs = interval.as_secs(), "export poll worker started");

                refresher.refresh(RefreshMode::Initial).await;

                let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

                loop {
                    tokio::select! {
                        _ = shutdown.notified() => {
                            tracing::info!("export poll worker received shutdown signal");
                            break;
                        }
                        _ = ticker.tick() => {
                            refresher.refresh(RefreshMode::Background).await;
                        }
                    }
                }
            }
        });

        PollHandle {
            shutdown,
            refresher: self.refresher,
            task: Some(task),
        }
    }
}

/// Owner of a running [`PollWorker`]. Dropping it stops polling.
pub struct PollHandle {
    shutdown: Arc<Notify>,
    refresher: Arc<dyn RefreshSink>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Stop polling and wait for the loop to exit. Results of a refresh still
    /// in flight are dropped.
    pub async fn shutdown(mut self) {
        self.refresher.dispose();
        self.shutdown.notify_one();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "export poll worker ended abnormally");
            }
        }
        tracing::info!("export poll worker stopped");
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            self.refresher.dispose();
            task.abort();
        }
    }
}
