//! Remote job gateway.
//!
//! The backend owns every job. The client only talks to it through
//! [`JobGateway`]; nothing is cached or mutated locally on its behalf.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use telexport_core::{DateRange, ExportJob, ExportResult, JobId, TenantId};

pub mod http;
pub mod in_memory;

pub use http::HttpJobGateway;
pub use in_memory::{CallCounts, InMemoryJobGateway};

/// Acknowledgement returned by cancel and delete.
///
/// The backend answers with a small status object (`{"status": "cancelling"}`)
/// that the client logs but never relies on; the next refresh is what counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub status: Option<String>,
}

impl Ack {
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
        }
    }
}

/// A downloaded export file, before a filename has been chosen for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub bytes: Vec<u8>,
    /// Filename from the response `Content-Disposition`, already normalized.
    pub suggested_filename: Option<String>,
    pub content_type: Option<String>,
}

/// Typed operations against the export backend.
///
/// Every failure maps to an [`telexport_core::ExportError`] carrying a
/// user-presentable message.
#[async_trait]
pub trait JobGateway: Send + Sync {
    /// All jobs visible to the caller.
    async fn list_jobs(&self) -> ExportResult<Vec<ExportJob>>;

    /// Create a job. The answer may carry only `job_id` and `status`.
    async fn create_job(
        &self,
        range: &DateRange,
        tenant_id: Option<&TenantId>,
    ) -> ExportResult<ExportJob>;

    async fn cancel_job(&self, job_id: &JobId) -> ExportResult<Ack>;

    async fn delete_job(&self, job_id: &JobId) -> ExportResult<Ack>;

    async fn download_job(&self, job_id: &JobId) -> ExportResult<Download>;
}
