//! Latest known job list.

use chrono::{DateTime, Utc};
use telexport_core::{ExportJob, JobId, ViewRow};

/// What the client currently believes about the backend's jobs.
///
/// Replaced wholesale by every applied refresh; never patched in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobSnapshot {
    pub jobs: Vec<ExportJob>,
    /// An initial (user-visible) refresh is in flight.
    pub loading: bool,
    /// Message of the last refresh failure, cleared by the next success.
    pub error: Option<String>,
    /// When the job list was last replaced.
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Sequence number of the refresh whose result is applied (0 = none yet).
    pub version: u64,
}

impl JobSnapshot {
    pub fn find(&self, job_id: &JobId) -> Option<&ExportJob> {
        self.jobs.iter().find(|job| &job.job_id == job_id)
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Display rows in backend order.
    pub fn rows(&self) -> Vec<ViewRow> {
        self.jobs.iter().map(ViewRow::from_job).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telexport_core::JobStatus;

    fn job(id: &str) -> ExportJob {
        serde_json::from_value(serde_json::json!({"job_id": id, "status": "queued"})).unwrap()
    }

    #[test]
    fn find_looks_up_by_job_id() {
        let snapshot = JobSnapshot {
            jobs: vec![job("a"), job("b")],
            ..JobSnapshot::default()
        };
        assert_eq!(
            snapshot.find(&JobId::new("b")).map(|j| &j.status),
            Some(&JobStatus::Queued)
        );
        assert!(snapshot.find(&JobId::new("c")).is_none());
        assert_eq!(snapshot.rows().len(), 2);
    }
}
