//! User actions on export jobs: submit, download, cancel and delete.
//!
//! Guards are evaluated against the freshest snapshot at the moment the action
//! runs, never against a row rendered earlier. Every successful mutation is
//! followed by exactly one initial refresh.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, TimeZone};
use serde::Serialize;
use telexport_core::filename::{SPREADSHEET_CONTENT_TYPE, resolve_download_filename};
use telexport_core::{DateRange, ExportError, ExportJob, ExportResult, JobId, TenantId};
use tokio::sync::{broadcast, watch};

use crate::gateway::{Ack, JobGateway};
use crate::reconcile::{Reconciler, RefreshMode, RefreshSink};
use crate::snapshot::JobSnapshot;

const NOTICE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobAction {
    Download,
    Cancel,
    Delete,
}

impl core::fmt::Display for JobAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Download => "download",
            Self::Cancel => "cancel",
            Self::Delete => "delete",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Cannot {action} job {job_id} while it is {status}")]
    NotAllowed {
        action: JobAction,
        job_id: JobId,
        status: String,
    },

    #[error("Job {0} is not in the current job list")]
    UnknownJob(JobId),

    #[error("No delete is awaiting confirmation")]
    NoPendingDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient user-facing message (a toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Raw submit form input. Dates are calendar dates as the user picked them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitForm {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub tenant_id: Option<String>,
}

/// A submit form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub range: DateRange,
    pub tenant_id: Option<TenantId>,
}

impl SubmitForm {
    pub fn new(date_from: NaiveDate, date_to: NaiveDate) -> Self {
        Self {
            date_from: Some(date_from),
            date_to: Some(date_to),
            tenant_id: None,
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Build from picker values, keeping each value's own calendar date
    /// (no conversion to UTC, which could shift the day).
    pub fn from_picked<Tz: TimeZone>(
        date_from: Option<DateTime<Tz>>,
        date_to: Option<DateTime<Tz>>,
        tenant_id: Option<String>,
    ) -> Self {
        Self {
            date_from: date_from.map(|d| d.date_naive()),
            date_to: date_to.map(|d| d.date_naive()),
            tenant_id,
        }
    }

    pub fn validate(&self) -> ExportResult<ExportRequest> {
        let (Some(from), Some(to)) = (self.date_from, self.date_to) else {
            return Err(ExportError::validation(
                "Please select both start date and end date",
            ));
        };
        Ok(ExportRequest {
            range: DateRange::new(from, to)?,
            tenant_id: TenantId::from_input(self.tenant_id.as_deref()),
        })
    }
}

/// Delete confirmation awaiting an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePrompt {
    pub job_id: JobId,
    pub message: String,
}

/// A downloaded file with its final name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl DownloadedFile {
    /// Write into `dir` under [`DownloadedFile::filename`].
    pub async fn save_into(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let path = dir.join(&self.filename);
        tokio::fs::write(&path, &self.bytes).await?;
        Ok(path)
    }
}

pub struct JobActions {
    gateway: Arc<dyn JobGateway>,
    refresher: Arc<dyn RefreshSink>,
    snapshot: watch::Receiver<JobSnapshot>,
    pending_delete: Mutex<Option<JobId>>,
    notices: broadcast::Sender<Notice>,
}

impl JobActions {
    pub fn new(
        gateway: Arc<dyn JobGateway>,
        refresher: Arc<dyn RefreshSink>,
        snapshot: watch::Receiver<JobSnapshot>,
    ) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            gateway,
            refresher,
            snapshot,
            pending_delete: Mutex::new(None),
            notices,
        }
    }

    /// Wire actions to a reconciler sharing the same gateway.
    pub fn attach(gateway: Arc<dyn JobGateway>, reconciler: &Arc<Reconciler>) -> Self {
        let snapshot = reconciler.subscribe();
        Self::new(gateway, reconciler.clone(), snapshot)
    }

    /// Toasts. Lossy: slow subscribers miss old notices.
    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub async fn submit(&self, form: &SubmitForm) -> Result<ExportJob, ActionError> {
        let request = form.validate().map_err(|err| self.fail(err))?;

        let job = self
            .gateway
            .create_job(&request.range, request.tenant_id.as_ref())
            .await
            .map_err(|err| self.fail(err))?;

        tracing::info!(
            job_id = %job.job_id,
            date_from = %request.range.from(),
            date_to = %request.range.to(),
            days = request.range.days(),
            tenant_id = request.tenant_id.as_ref().map(TenantId::as_str),
            "export job submitted"
        );
        self.notify(Notice::success("Request submitted successfully!"));
        self.refresher.refresh(RefreshMode::Initial).await;
        Ok(job)
    }

    pub async fn download(&self, job_id: &JobId) -> Result<DownloadedFile, ActionError> {
        let job = self.guard(JobAction::Download, job_id)?;

        let download = self
            .gateway
            .download_job(job_id)
            .await
            .map_err(|err| self.fail(err))?;

        let filename = resolve_download_filename(
            job_id,
            job.date_range().as_ref(),
            download.suggested_filename.as_deref(),
        );
        tracing::info!(%job_id, %filename, bytes = download.bytes.len(), "export downloaded");

        Ok(DownloadedFile {
            filename,
            content_type: download
                .content_type
                .unwrap_or_else(|| SPREADSHEET_CONTENT_TYPE.to_string()),
            bytes: download.bytes,
        })
    }

    pub async fn cancel(&self, job_id: &JobId) -> Result<Ack, ActionError> {
        self.guard(JobAction::Cancel, job_id)?;

        let ack = self
            .gateway
            .cancel_job(job_id)
            .await
            .map_err(|err| self.fail(err))?;

        tracing::info!(%job_id, ack = ?ack.status, "export cancellation requested");
        self.notify(Notice::success(format!("Cancellation requested for job {job_id}")));
        self.refresher.refresh(RefreshMode::Initial).await;
        Ok(ack)
    }

    /// Open the delete confirmation for `job_id`. Nothing is sent yet.
    pub fn request_delete(&self, job_id: &JobId) -> Result<DeletePrompt, ActionError> {
        self.guard(JobAction::Delete, job_id)?;
        *self.pending() = Some(job_id.clone());
        Ok(DeletePrompt {
            job_id: job_id.clone(),
            message: format!("Delete export job {job_id}?"),
        })
    }

    pub fn pending_delete(&self) -> Option<JobId> {
        self.pending().clone()
    }

    /// Close the confirmation without deleting anything.
    pub fn dismiss_delete(&self) {
        if let Some(job_id) = self.pending().take() {
            tracing::debug!(%job_id, "delete dismissed");
        }
    }

    /// Delete the job named by the open confirmation. The prompt is closed
    /// whatever the outcome.
    pub async fn confirm_delete(&self) -> Result<Ack, ActionError> {
        let job_id = self.pending().take().ok_or(ActionError::NoPendingDelete)?;

        // The job may have started running while the prompt was open.
        self.guard(JobAction::Delete, &job_id)?;

        let ack = self
            .gateway
            .delete_job(&job_id)
            .await
            .map_err(|err| self.fail(err))?;

        tracing::info!(%job_id, "export job deleted");
        self.notify(Notice::success(format!("Export job {job_id} deleted")));
        self.refresher.refresh(RefreshMode::Initial).await;
        Ok(ack)
    }

    /// Look the job up in the latest snapshot and check `action` is allowed.
    /// Unknown jobs and unrecognized statuses fail closed.
    fn guard(&self, action: JobAction, job_id: &JobId) -> Result<ExportJob, ActionError> {
        let job = self.snapshot.borrow().find(job_id).cloned();
        let Some(job) = job else {
            let err = ActionError::UnknownJob(job_id.clone());
            tracing::warn!(%job_id, %action, "action on unknown job refused");
            self.notify(Notice::error(err.to_string()));
            return Err(err);
        };

        let allowed = match action {
            JobAction::Download => job.can_download(),
            JobAction::Cancel => job.can_cancel(),
            JobAction::Delete => job.can_delete(),
        };
        if !allowed {
            let err = ActionError::NotAllowed {
                action,
                job_id: job_id.clone(),
                status: job.status.label(),
            };
            tracing::warn!(%job_id, %action, status = job.status.as_str(), "action not allowed");
            self.notify(Notice::error(err.to_string()));
            return Err(err);
        }
        Ok(job)
    }

    fn fail(&self, err: ExportError) -> ActionError {
        if !err.is_validation() {
            tracing::warn!(kind = err.kind(), status = ?err.status(), error = %err, "export action failed");
        }
        self.notify(Notice::error(err.user_message()));
        ActionError::Export(err)
    }

    fn notify(&self, notice: Notice) {
        // No subscribers is fine.
        let _ = self.notices.send(notice);
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, Option<JobId>> {
        self.pending_delete
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};
    use telexport_core::JobStatus;

    use crate::gateway::InMemoryJobGateway;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn job(id: &str, status: &str) -> ExportJob {
        serde_json::from_value(serde_json::json!({
            "job_id": id,
            "status": status,
            "date_from": "2024-02-01",
            "date_to": "2024-02-05",
        }))
        .unwrap()
    }

    async fn setup(jobs: Vec<ExportJob>) -> (Arc<InMemoryJobGateway>, Arc<Reconciler>, JobActions) {
        let gateway = Arc::new(InMemoryJobGateway::with_jobs(jobs));
        let reconciler = Arc::new(Reconciler::new(gateway.clone()));
        reconciler.refresh(RefreshMode::Initial).await;
        let actions = JobActions::attach(gateway.clone(), &reconciler);
        (gateway, reconciler, actions)
    }

    #[test]
    fn form_requires_both_dates() {
        let err = SubmitForm {
            date_from: Some(date(2, 1)),
            ..SubmitForm::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.user_message(), "Please select both start date and end date");

        let err = SubmitForm::new(date(2, 5), date(2, 1)).validate().unwrap_err();
        assert_eq!(err.user_message(), "End date cannot be before start date");
    }

    #[test]
    fn picked_dates_keep_their_local_calendar_day() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let from = plus_two.with_ymd_and_hms(2024, 2, 1, 0, 30, 0).unwrap();
        let to = plus_two.with_ymd_and_hms(2024, 2, 5, 23, 0, 0).unwrap();

        let form = SubmitForm::from_picked(Some(from), Some(to), Some("  ".into()));
        let request = form.validate().unwrap();
        assert_eq!(request.range.from_param(), "2024-02-01");
        assert_eq!(request.range.to_param(), "2024-02-05");
        assert_eq!(request.tenant_id, None);
    }

    #[tokio::test]
    async fn invalid_form_sends_nothing() {
        let (gateway, _, actions) = setup(vec![]).await;
        let mut notices = actions.subscribe_notices();

        let err = actions
            .submit(&SubmitForm::new(date(3, 2), date(3, 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Export(ref e) if e.is_validation()));
        assert_eq!(gateway.calls().create, 0);
        assert_eq!(notices.recv().await.unwrap().level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn submit_refreshes_once_and_announces_success() {
        let (gateway, reconciler, actions) = setup(vec![]).await;
        let mut notices = actions.subscribe_notices();
        let lists_before = gateway.calls().list;

        let created = actions
            .submit(&SubmitForm::new(date(3, 1), date(3, 2)).with_tenant(" t-9 "))
            .await
            .unwrap();

        assert_eq!(gateway.calls().list, lists_before + 1);
        assert_eq!(
            notices.recv().await.unwrap(),
            Notice::success("Request submitted successfully!")
        );
        let snapshot = reconciler.snapshot();
        let listed = snapshot.find(&created.job_id).unwrap();
        assert_eq!(listed.tenant_id, Some(TenantId::new("t-9")));
    }

    #[tokio::test]
    async fn failed_submit_surfaces_backend_message_without_refresh() {
        let (gateway, _, actions) = setup(vec![]).await;
        gateway.fail_next_action(ExportError::gateway(422, "Date range too large"));
        let lists_before = gateway.calls().list;

        let err = actions
            .submit(&SubmitForm::new(date(3, 1), date(3, 2)))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Date range too large");
        assert_eq!(gateway.calls().list, lists_before);
    }

    #[tokio::test]
    async fn download_uses_date_range_filename() {
        let (gateway, _, actions) = setup(vec![job("done-1", "done")]).await;
        gateway.set_file(&JobId::new("done-1"), b"xlsx".to_vec());

        let file = actions.download(&JobId::new("done-1")).await.unwrap();
        assert_eq!(file.filename, "export_20240201_to_20240205.xlsx");
        assert_eq!(file.content_type, SPREADSHEET_CONTENT_TYPE);
        assert_eq!(file.bytes, b"xlsx");

        let dir = tempfile::tempdir().unwrap();
        let path = file.save_into(dir.path()).await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"xlsx");
    }

    #[tokio::test]
    async fn guards_use_the_freshest_snapshot() {
        let (gateway, reconciler, actions) = setup(vec![job("j", "running")]).await;

        let err = actions.download(&JobId::new("j")).await.unwrap_err();
        assert!(matches!(err, ActionError::NotAllowed { action: JobAction::Download, .. }));
        assert_eq!(gateway.calls().download, 0);

        gateway.set_status(&JobId::new("j"), JobStatus::Completed);
        reconciler.refresh(RefreshMode::Background).await;
        assert!(actions.download(&JobId::new("j")).await.is_ok());

        let err = actions.cancel(&JobId::new("j")).await.unwrap_err();
        assert!(matches!(err, ActionError::NotAllowed { action: JobAction::Cancel, .. }));
        assert_eq!(gateway.calls().cancel, 0);
    }

    #[tokio::test]
    async fn unknown_statuses_and_jobs_fail_closed() {
        let (gateway, _, actions) = setup(vec![job("c", "cancelling")]).await;

        for result in [
            actions.cancel(&JobId::new("c")).await.map(|_| ()),
            actions.request_delete(&JobId::new("c")).map(|_| ()),
            actions.download(&JobId::new("c")).await.map(|_| ()),
        ] {
            assert!(matches!(result, Err(ActionError::NotAllowed { .. })));
        }
        assert!(matches!(
            actions.cancel(&JobId::new("missing")).await,
            Err(ActionError::UnknownJob(_))
        ));
        let calls = gateway.calls();
        assert_eq!((calls.cancel, calls.delete, calls.download), (0, 0, 0));
    }

    #[tokio::test]
    async fn cancel_refreshes_once() {
        let (gateway, reconciler, actions) = setup(vec![job("q", "queued")]).await;
        let lists_before = gateway.calls().list;

        actions.cancel(&JobId::new("q")).await.unwrap();

        assert_eq!(gateway.calls().list, lists_before + 1);
        assert_eq!(
            reconciler.snapshot().find(&JobId::new("q")).unwrap().status,
            JobStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn delete_waits_for_confirmation() {
        let (gateway, reconciler, actions) = setup(vec![job("old", "failed")]).await;

        let prompt = actions.request_delete(&JobId::new("old")).unwrap();
        assert!(prompt.message.contains("old"));
        assert_eq!(actions.pending_delete(), Some(JobId::new("old")));
        assert_eq!(gateway.calls().delete, 0);

        actions.dismiss_delete();
        assert_eq!(actions.pending_delete(), None);
        assert_eq!(
            actions.confirm_delete().await.unwrap_err(),
            ActionError::NoPendingDelete
        );

        actions.request_delete(&JobId::new("old")).unwrap();
        actions.confirm_delete().await.unwrap();
        assert_eq!(gateway.calls().delete, 1);
        assert_eq!(actions.pending_delete(), None);
        assert!(reconciler.snapshot().is_empty());
    }

    #[tokio::test]
    async fn confirm_rechecks_status_and_closes_prompt_on_failure() {
        let (gateway, reconciler, actions) = setup(vec![job("q", "queued")]).await;
        actions.request_delete(&JobId::new("q")).unwrap();

        gateway.set_status(&JobId::new("q"), JobStatus::Running);
        reconciler.refresh(RefreshMode::Background).await;

        let err = actions.confirm_delete().await.unwrap_err();
        assert!(matches!(err, ActionError::NotAllowed { action: JobAction::Delete, .. }));
        assert_eq!(gateway.calls().delete, 0);
        assert_eq!(actions.pending_delete(), None);
    }

    #[tokio::test]
    async fn backend_rejection_of_delete_is_surfaced() {
        let (gateway, _, actions) = setup(vec![job("q", "queued")]).await;
        actions.request_delete(&JobId::new("q")).unwrap();
        gateway.fail_next_action(ExportError::gateway(400, "Cannot delete a running job"));

        let mut notices = actions.subscribe_notices();
        let err = actions.confirm_delete().await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot delete a running job");
        assert_eq!(
            notices.recv().await.unwrap(),
            Notice::error("Cannot delete a running job")
        );
        assert_eq!(actions.pending_delete(), None);
    }

    #[test]
    fn utc_picks_are_dates_too() {
        let from = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let form = SubmitForm::from_picked(Some(from), None, None);
        assert_eq!(form.date_from, Some(date(5, 1)));
        assert!(form.validate().is_err());
    }
}
