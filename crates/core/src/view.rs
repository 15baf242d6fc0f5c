//! Display projection of an [`ExportJob`].
//!
//! A [`ViewRow`] is derived data for rendering and sorting. Action guards never
//! consult it; they look up the job in the latest snapshot instead.

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::id::{JobId, TenantId};
use crate::job::{ExportJob, Progress};
use crate::status::{JobStatus, StatusTone};

/// Characters of a tenant id shown before truncation.
pub const TENANT_DISPLAY_CHARS: usize = 12;

const MISSING: &str = "-";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewRow {
    pub job_id: JobId,
    /// Full tenant id (tooltip / accessibility label).
    pub tenant_id: Option<TenantId>,
    pub tenant_display: String,
    pub created_at: Option<DateTime<Utc>>,
    pub created_at_display: String,
    pub date_from: Option<NaiveDate>,
    pub date_from_display: String,
    pub date_to: Option<NaiveDate>,
    pub date_to_display: String,
    pub status: JobStatus,
    pub status_label: String,
    pub tone: StatusTone,
    pub progress: Option<Progress>,
    pub error: Option<String>,
}

impl ViewRow {
    /// Project using the local time zone for timestamps.
    pub fn from_job(job: &ExportJob) -> Self {
        Self::project(job, &Local)
    }

    /// Project, rendering timestamps in `tz`.
    pub fn project<Tz>(job: &ExportJob, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: core::fmt::Display,
    {
        let created_at_display = job
            .created_at
            .map(|ts| {
                ts.with_timezone(tz)
                    .format("%b %-d, %Y, %I:%M %p")
                    .to_string()
            })
            .unwrap_or_else(|| MISSING.to_string());

        let tenant_display = job
            .tenant_id
            .as_ref()
            .map(|t| t.truncated(TENANT_DISPLAY_CHARS))
            .unwrap_or_else(|| "All tenants".to_string());

        Self {
            job_id: job.job_id.clone(),
            tenant_id: job.tenant_id.clone(),
            tenant_display,
            created_at: job.created_at,
            created_at_display,
            date_from: job.date_from,
            date_from_display: display_date(job.date_from),
            date_to: job.date_to,
            date_to_display: display_date(job.date_to),
            status: job.status.clone(),
            status_label: job.status.label(),
            tone: job.status.tone(),
            progress: job.progress.clone(),
            error: job.error.clone(),
        }
    }
}

fn display_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|| MISSING.to_string())
}
