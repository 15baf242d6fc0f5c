//! The export job record as reported by the backend.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::id::{JobId, TenantId};
use crate::range::DateRange;
use crate::status::JobStatus;
use crate::value_object::ValueObject;

/// Informational progress reported by the worker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub stage: String,
    #[serde(default)]
    pub percent: f64,
}

impl ValueObject for Progress {}

/// One export job (remote, authoritative).
///
/// Only `job_id` and `status` are guaranteed: the create endpoint answers with
/// just those two fields, the list endpoint fills in the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJob {
    pub job_id: JobId,
    #[serde(default, deserialize_with = "blank_tenant_as_none")]
    pub tenant_id: Option<TenantId>,
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: Option<Progress>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, with = "backend_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ExportJob {
    /// A freshly queued job, as the client knows it right after submission.
    pub fn queued(job_id: JobId, range: DateRange, tenant_id: Option<TenantId>) -> Self {
        Self {
            job_id,
            tenant_id,
            date_from: Some(range.from()),
            date_to: Some(range.to()),
            status: JobStatus::Queued,
            progress: None,
            file_path: None,
            error: None,
            created_at: None,
        }
    }

    /// The job's date range, when both ends are known and ordered.
    pub fn date_range(&self) -> Option<DateRange> {
        match (self.date_from, self.date_to) {
            (Some(from), Some(to)) => DateRange::new(from, to).ok(),
            _ => None,
        }
    }

    pub fn can_download(&self) -> bool {
        self.status.can_download()
    }

    pub fn can_delete(&self) -> bool {
        self.status.can_delete()
    }

    pub fn can_cancel(&self) -> bool {
        self.status.can_cancel()
    }
}

fn blank_tenant_as_none<'de, D>(deserializer: D) -> Result<Option<TenantId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(TenantId::from_input(raw.as_deref()))
}

/// Backend timestamps are RFC 3339, or naive ISO 8601 meaning UTC.
mod backend_timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_some(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        parse(&raw).map(Some).map_err(serde::de::Error::custom)
    }

    pub(crate) fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .map(|naive| naive.and_utc())
            .map_err(|e| format!("invalid timestamp {raw:?}: {e}"))
    }
}
