//! HTTP implementation of [`JobGateway`] on top of `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use telexport_core::filename::filename_from_content_disposition;
use telexport_core::{DateRange, ExportError, ExportJob, ExportResult, JobId, TenantId};

use super::{Ack, Download, JobGateway};
use crate::config::ClientSettings;

#[derive(Debug, Clone, Copy)]
enum Operation {
    List,
    Create,
    Cancel,
    Delete,
    Download,
}

impl Operation {
    fn name(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Cancel => "cancel",
            Self::Delete => "delete",
            Self::Download => "download",
        }
    }

    /// Message shown when the backend gives no usable reason.
    fn fallback(self) -> &'static str {
        match self {
            Self::List => "Failed to fetch telemetry data",
            Self::Create => "Failed to submit request",
            Self::Cancel => "Failed to cancel export",
            Self::Delete => "Failed to delete export",
            Self::Download => "Failed to download file",
        }
    }
}

/// Gateway speaking the export backend's REST dialect.
///
/// `GET /exports`, `POST /exports?date_from&date_to[&tenant_id]`,
/// `POST /exports/{id}/cancel`, `DELETE /exports/{id}` and
/// `GET /exports/{id}/download` (the latter against a separately configurable
/// base URL).
#[derive(Debug, Clone)]
pub struct HttpJobGateway {
    client: reqwest::Client,
    api_base: Url,
    download_base: Url,
}

impl HttpJobGateway {
    pub fn new(api_url: &str, download_url: Option<&str>, timeout: Duration) -> ExportResult<Self> {
        let api_base = parse_base(api_url)?;
        let download_base = match download_url {
            Some(url) => parse_base(url)?,
            None => api_base.clone(),
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExportError::transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base,
            download_base,
        })
    }

    pub fn from_settings(settings: &ClientSettings) -> ExportResult<Self> {
        Self::new(
            &settings.backend_url,
            Some(settings.download_base()),
            settings.request_timeout(),
        )
    }

    /// `base` with `segments` appended, each percent-encoded as one segment.
    fn endpoint(base: &Url, segments: &[&str]) -> ExportResult<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| ExportError::validation(format!("{base} cannot be used as a base URL")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, op: Operation, request: RequestBuilder) -> ExportResult<Response> {
        let response = request.send().await.map_err(|e| transport_error(op, &e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let err = ExportError::from_backend_body(status.as_u16(), &body, op.fallback());
        tracing::warn!(
            operation = op.name(),
            status = status.as_u16(),
            error = %err,
            "export backend rejected request"
        );
        Err(err)
    }

    async fn read_json<T: DeserializeOwned>(op: Operation, response: Response) -> ExportResult<T> {
        let body = response.bytes().await.map_err(|e| transport_error(op, &e))?;
        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(operation = op.name(), error = %e, "malformed export backend response");
            ExportError::malformed(format!(
                "{}: unexpected response from export service",
                op.fallback()
            ))
        })
    }

    /// Acks are informational; an unreadable one is not a failure.
    async fn read_ack(op: Operation, response: Response) -> Ack {
        let body = response.bytes().await.unwrap_or_default();
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ack::default();
        }
        serde_json::from_slice(&body).unwrap_or_else(|e| {
            tracing::debug!(operation = op.name(), error = %e, "ignoring unreadable ack body");
            Ack::default()
        })
    }
}

#[async_trait]
impl JobGateway for HttpJobGateway {
    async fn list_jobs(&self) -> ExportResult<Vec<ExportJob>> {
        let op = Operation::List;
        let url = Self::endpoint(&self.api_base, &["exports"])?;
        tracing::debug!(%url, "listing export jobs");

        let response = self.send(op, self.client.get(url)).await?;
        Self::read_json(op, response).await
    }

    async fn create_job(
        &self,
        range: &DateRange,
        tenant_id: Option<&TenantId>,
    ) -> ExportResult<ExportJob> {
        let op = Operation::Create;
        let url = Self::endpoint(&self.api_base, &["exports"])?;

        let mut query = vec![("date_from", range.from_param()), ("date_to", range.to_param())];
        if let Some(tenant) = tenant_id {
            query.push(("tenant_id", tenant.to_string()));
        }
        tracing::debug!(%url, date_from = %range.from(), date_to = %range.to(), "creating export job");

        let response = self.send(op, self.client.post(url).query(&query)).await?;
        Self::read_json(op, response).await
    }

    async fn cancel_job(&self, job_id: &JobId) -> ExportResult<Ack> {
        let op = Operation::Cancel;
        let url = Self::endpoint(&self.api_base, &["exports", job_id.as_str(), "cancel"])?;
        tracing::debug!(%url, "cancelling export job");

        let response = self.send(op, self.client.post(url)).await?;
        Ok(Self::read_ack(op, response).await)
    }

    async fn delete_job(&self, job_id: &JobId) -> ExportResult<Ack> {
        let op = Operation::Delete;
        let url = Self::endpoint(&self.api_base, &["exports", job_id.as_str()])?;
        tracing::debug!(%url, "deleting export job");

        let response = self.send(op, self.client.delete(url)).await?;
        Ok(Self::read_ack(op, response).await)
    }

    async fn download_job(&self, job_id: &JobId) -> ExportResult<Download> {
        let op = Operation::Download;
        let url = Self::endpoint(&self.download_base, &["exports", job_id.as_str(), "download"])?;
        tracing::debug!(%url, "downloading export file");

        let response = self.send(op, self.client.get(url)).await?;
        let headers = response.headers();
        let suggested_filename = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_content_disposition);
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await.map_err(|e| transport_error(op, &e))?;
        Ok(Download {
            bytes: bytes.to_vec(),
            suggested_filename,
            content_type,
        })
    }
}

fn parse_base(raw: &str) -> ExportResult<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ExportError::validation(format!("invalid export service URL {raw:?}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ExportError::validation(format!(
            "{raw} cannot be used as a base URL"
        )));
    }
    Ok(url)
}

fn transport_error(op: Operation, err: &reqwest::Error) -> ExportError {
    tracing::warn!(operation = op.name(), error = %err, "export service unreachable");
    let reason = if err.is_timeout() {
        "request timed out"
    } else {
        "export service unreachable"
    };
    ExportError::transport(format!("{}: {reason}", op.fallback()))
}
