//! Poll-and-reconcile: keep the local [`JobSnapshot`] equal to the backend's
//! job list.
//!
//! Refreshes may overlap (a user action's refresh racing a poll tick). Each
//! refresh takes a sequence number when it starts, and a response is applied
//! only if no later-started refresh has been applied already, so a slow stale
//! answer can never overwrite a newer one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use telexport_core::{ExportError, ExportJob, ExportResult};
use tokio::sync::watch;

use crate::gateway::JobGateway;
use crate::snapshot::JobSnapshot;

/// How a refresh presents itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// User-visible: raises the loading flag, and a failure clears the list.
    Initial,
    /// Silent poll: a failure keeps the last known list.
    Background,
}

/// What happened to a refresh's result.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Applied { jobs: usize },
    Failed(ExportError),
    /// A newer result was already applied, or the reconciler was disposed.
    Discarded,
}

/// Anything that can be asked to re-read the job list.
#[async_trait]
pub trait RefreshSink: Send + Sync {
    async fn refresh(&self, mode: RefreshMode) -> RefreshOutcome;

    /// Stop publishing results. In-flight refreshes finish but are dropped.
    fn dispose(&self) {}
}

pub struct Reconciler {
    gateway: Arc<dyn JobGateway>,
    state: watch::Sender<JobSnapshot>,
    next_seq: AtomicU64,
    initial_in_flight: AtomicUsize,
    disposed: AtomicBool,
}

impl Reconciler {
    pub fn new(gateway: Arc<dyn JobGateway>) -> Self {
        let (state, _) = watch::channel(JobSnapshot::default());
        Self {
            gateway,
            state,
            next_seq: AtomicU64::new(0),
            initial_in_flight: AtomicUsize::new(0),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.state.subscribe()
    }

    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            tracing::debug!("job reconciler disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Fetch the job list and apply it, unless it is stale by the time it
    /// arrives.
    pub async fn refresh(&self, mode: RefreshMode) -> RefreshOutcome {
        if self.is_disposed() {
            return RefreshOutcome::Discarded;
        }

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let _loading = match mode {
            RefreshMode::Initial => Some(LoadingGuard::begin(self)),
            RefreshMode::Background => None,
        };

        let result = self.gateway.list_jobs().await;

        if self.is_disposed() {
            tracing::debug!(seq, ?mode, "dropping job list fetched after disposal");
            return RefreshOutcome::Discarded;
        }
        self.apply(seq, mode, result)
    }

    fn apply(
        &self,
        seq: u64,
        mode: RefreshMode,
        result: ExportResult<Vec<ExportJob>>,
    ) -> RefreshOutcome {
        let mut outcome = RefreshOutcome::Discarded;

        self.state.send_if_modified(|snapshot| {
            if seq <= snapshot.version {
                return false;
            }
            snapshot.version = seq;

            match &result {
                Ok(jobs) => {
                    snapshot.jobs = jobs.clone();
                    snapshot.error = None;
                    snapshot.refreshed_at = Some(Utc::now());
                    outcome = RefreshOutcome::Applied { jobs: jobs.len() };
                }
                Err(err) => {
                    snapshot.error = Some(err.user_message().to_string());
                    if mode == RefreshMode::Initial {
                        snapshot.jobs.clear();
                    }
                    outcome = RefreshOutcome::Failed(err.clone());
                }
            }
            true
        });

        match (&outcome, &result) {
            (RefreshOutcome::Applied { jobs }, _) => {
                tracing::debug!(seq, ?mode, jobs, "job list refreshed");
            }
            (RefreshOutcome::Failed(err), _) => {
                tracing::warn!(seq, ?mode, kind = err.kind(), error = %err, "job list refresh failed");
            }
            (RefreshOutcome::Discarded, Err(err)) => {
                tracing::warn!(seq, ?mode, error = %err, "stale job list refresh failed");
            }
            (RefreshOutcome::Discarded, Ok(_)) => {
                tracing::debug!(seq, ?mode, "discarding stale job list");
            }
        }
        outcome
    }

    /// Re-derive the loading flag from the in-flight counter. Runs under the
    /// channel's write lock, so the last writer always sees the current count.
    fn sync_loading(&self) {
        if self.is_disposed() {
            return;
        }
        self.state.send_if_modified(|snapshot| {
            let loading = self.initial_in_flight.load(Ordering::SeqCst) > 0;
            let changed = snapshot.loading != loading;
            snapshot.loading = loading;
            changed
        });
    }
}

#[async_trait]
impl RefreshSink for Reconciler {
    async fn refresh(&self, mode: RefreshMode) -> RefreshOutcome {
        Reconciler::refresh(self, mode).await
    }

    fn dispose(&self) {
        Reconciler::dispose(self);
    }
}

/// Keeps `loading` raised while at least one initial refresh is in flight,
/// on every exit path.
struct LoadingGuard<'a> {
    reconciler: &'a Reconciler,
}

impl<'a> LoadingGuard<'a> {
    fn begin(reconciler: &'a Reconciler) -> Self {
        reconciler.initial_in_flight.fetch_add(1, Ordering::SeqCst);
        reconciler.sync_loading();
        Self { reconciler }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.reconciler
            .initial_in_flight
            .fetch_sub(1, Ordering::SeqCst);
        self.reconciler.sync_loading();
    }
}
