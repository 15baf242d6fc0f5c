//! In-memory gateway that behaves like the export backend.
//!
//! Used by tests and local demos. Jobs never progress on their own; drive them
//! with [`InMemoryJobGateway::set_status`].

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use telexport_core::filename::SPREADSHEET_CONTENT_TYPE;
use telexport_core::{
    DateRange, ExportError, ExportJob, ExportResult, JobId, JobStatus, Progress, TenantId,
};
use uuid::Uuid;

use super::{Ack, Download, JobGateway};

/// Number of calls received per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list: usize,
    pub create: usize,
    pub cancel: usize,
    pub delete: usize,
    pub download: usize,
}

#[derive(Debug, Default)]
struct State {
    /// Newest first, like the backend's list ordering.
    jobs: Vec<ExportJob>,
    files: HashMap<JobId, Vec<u8>>,
    calls: CallCounts,
    list_failures: VecDeque<ExportError>,
    action_failure: Option<ExportError>,
}

#[derive(Debug, Default)]
pub struct InMemoryJobGateway {
    inner: Mutex<State>,
}

impl InMemoryJobGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing jobs (kept in the given order).
    pub fn with_jobs(jobs: impl IntoIterator<Item = ExportJob>) -> Self {
        let gateway = Self::new();
        gateway.lock().jobs = jobs.into_iter().collect();
        gateway
    }

    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    pub fn jobs(&self) -> Vec<ExportJob> {
        self.lock().jobs.clone()
    }

    /// Move a job to `status`. Completing a job also produces its file.
    pub fn set_status(&self, job_id: &JobId, status: JobStatus) -> bool {
        let mut state = self.lock();
        let Some(job) = state.jobs.iter_mut().find(|j| &j.job_id == job_id) else {
            return false;
        };
        job.status = status.clone();
        job.progress = Some(Progress {
            stage: status.as_str().to_string(),
            percent: if status == JobStatus::Completed { 100.0 } else { 0.0 },
        });
        if status == JobStatus::Completed {
            let path = format!("/exports/{job_id}.xlsx__");
            job.file_path = Some(path);
            state
                .files
                .entry(job_id.clone())
                .or_insert_with(|| b"PK\x03\x04 export".to_vec());
        }
        true
    }

    /// Replace the bytes served for a job's download.
    pub fn set_file(&self, job_id: &JobId, bytes: impl Into<Vec<u8>>) {
        self.lock().files.insert(job_id.clone(), bytes.into());
    }

    /// Make the next list call fail with `err`.
    pub fn fail_next_list(&self, err: ExportError) {
        self.lock().list_failures.push_back(err);
    }

    /// Make the next create / cancel / delete / download call fail with `err`.
    pub fn fail_next_action(&self, err: ExportError) {
        self.lock().action_failure = Some(err);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock only means a test panicked mid-update.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn not_found() -> ExportError {
    ExportError::gateway(404, "Job not found")
}

#[async_trait]
impl JobGateway for InMemoryJobGateway {
    async fn list_jobs(&self) -> ExportResult<Vec<ExportJob>> {
        let mut state = self.lock();
        state.calls.list += 1;
        if let Some(err) = state.list_failures.pop_front() {
            return Err(err);
        }
        Ok(state.jobs.clone())
    }

    async fn create_job(
        &self,
        range: &DateRange,
        tenant_id: Option<&TenantId>,
    ) -> ExportResult<ExportJob> {
        let mut state = self.lock();
        state.calls.create += 1;
        if let Some(err) = state.action_failure.take() {
            return Err(err);
        }

        let duplicate = state
            .jobs
            .iter()
            .any(|j| j.date_range().as_ref() == Some(range) && j.tenant_id.as_ref() == tenant_id);
        if duplicate {
            return Err(ExportError::gateway(409, "Job already exists"));
        }

        let mut job = ExportJob::queued(
            JobId::new(Uuid::now_v7().to_string()),
            *range,
            tenant_id.cloned(),
        );
        job.created_at = Some(Utc::now());
        job.progress = Some(Progress {
            stage: "queued".to_string(),
            percent: 0.0,
        });
        state.jobs.insert(0, job.clone());

        // The create endpoint only answers with id and status.
        Ok(ExportJob {
            tenant_id: None,
            date_from: None,
            date_to: None,
            progress: None,
            created_at: None,
            ..job
        })
    }

    async fn cancel_job(&self, job_id: &JobId) -> ExportResult<Ack> {
        let mut state = self.lock();
        state.calls.cancel += 1;
        if let Some(err) = state.action_failure.take() {
            return Err(err);
        }

        let job = state
            .jobs
            .iter_mut()
            .find(|j| &j.job_id == job_id)
            .ok_or_else(not_found)?;
        match job.status {
            // Nothing picked it up yet, so it stops right away.
            JobStatus::Queued => job.status = JobStatus::Cancelled,
            JobStatus::Running => job.status = JobStatus::normalize("cancelling"),
            _ => return Err(ExportError::gateway(409, "Job is not cancellable")),
        }
        Ok(Ack::with_status("cancelling"))
    }

    async fn delete_job(&self, job_id: &JobId) -> ExportResult<Ack> {
        let mut state = self.lock();
        state.calls.delete += 1;
        if let Some(err) = state.action_failure.take() {
            return Err(err);
        }

        let pos = state
            .jobs
            .iter()
            .position(|j| &j.job_id == job_id)
            .ok_or_else(not_found)?;
        if state.jobs[pos].status == JobStatus::Running {
            return Err(ExportError::gateway(400, "Cannot delete a running job"));
        }
        state.jobs.remove(pos);
        state.files.remove(job_id);
        Ok(Ack::with_status("deleted"))
    }

    async fn download_job(&self, job_id: &JobId) -> ExportResult<Download> {
        let mut state = self.lock();
        state.calls.download += 1;
        if let Some(err) = state.action_failure.take() {
            return Err(err);
        }

        let job = state
            .jobs
            .iter()
            .find(|j| &j.job_id == job_id)
            .ok_or_else(not_found)?;
        if job.status != JobStatus::Completed {
            return Err(ExportError::gateway(404, "File not ready"));
        }

        let suggested_filename = job
            .file_path
            .as_deref()
            .and_then(|p| p.rsplit('/').next())
            .map(telexport_core::filename::normalize_extension);
        let bytes = state.files.get(job_id).cloned().unwrap_or_default();

        Ok(Download {
            bytes,
            suggested_filename,
            content_type: Some(SPREADSHEET_CONTENT_TYPE.to_string()),
        })
    }
}
