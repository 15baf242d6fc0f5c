use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Extension, Path, Query, rejection::QueryRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use reqwest::RequestBuilder;
use serde_json::json;

use telexport_core::JobId;
use telexport_core::filename::{SPREADSHEET_CONTENT_TYPE, rewrite_content_disposition};

use crate::app::dto::CreateExportRequest;
use crate::app::errors;
use crate::app::services::{self, AppServices};

pub async fn list_exports(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    relay_json(
        services.get(&["exports"]),
        "list_exports",
        "Failed to fetch telemetry data",
    )
    .await
}

pub async fn create_export(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<CreateExportRequest>, QueryRejection>,
    body: Bytes,
) -> axum::response::Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(e) => {
            tracing::warn!(error = %e, "rejected create query string");
            return errors::json_error(StatusCode::BAD_REQUEST, "Invalid request parameters");
        }
    };
    let validated = match CreateExportRequest::from_body(&body).and_then(|b| b.or(query).validate())
    {
        Ok(v) => v,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, e.user_message()),
    };

    tracing::info!(
        date_from = %validated.range.from(),
        date_to = %validated.range.to(),
        tenant_id = validated.tenant_id.as_ref().map(|t| t.as_str()),
        "forwarding export request"
    );

    relay_json(
        services.post(&["exports"]).query(&validated.query()),
        "create_export",
        "Failed to submit request",
    )
    .await
}

pub async fn delete_export(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    relay_ack(
        services.delete(&["exports", &job_id]),
        "delete_export",
        "Failed to delete export",
    )
    .await
}

pub async fn cancel_export(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    relay_ack(
        services.post(&["exports", &job_id, "cancel"]),
        "cancel_export",
        "Failed to cancel export",
    )
    .await
}

/// Relay the file. The job id arrives percent-decoded once (by the path
/// extractor) and is re-encoded as a single segment towards the backend.
pub async fn download_export(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    let job_id = JobId::new(job_id);
    let request = services.get(&["exports", job_id.as_str(), "download"]);

    let Ok(response) = services::send(request, "download_export").await else {
        return errors::internal_error();
    };

    let status = errors::relay_status(response.status());
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(SPREADSHEET_CONTENT_TYPE)
        .to_string();
    let disposition = rewrite_content_disposition(
        response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok()),
        &job_id,
    );

    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(%job_id, error = %e, "failed to read export file from backend");
            return errors::internal_error();
        }
    };

    if !status.is_success() {
        return errors::upstream_error(status, &body, "Failed to download file");
    }

    tracing::info!(%job_id, bytes = body.len(), "relaying export file");
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

/// Relay a JSON answer as-is. A success body that is not JSON is treated as a
/// backend fault.
pub(crate) async fn relay_json(
    request: RequestBuilder,
    operation: &'static str,
    fallback: &'static str,
) -> axum::response::Response {
    let Some((status, body)) = fetch(request, operation).await else {
        return errors::internal_error();
    };
    if !status.is_success() {
        return errors::upstream_error(status, &body, fallback);
    }

    match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(value) => (status, Json(value)).into_response(),
        Err(e) => {
            tracing::error!(operation, error = %e, "export backend sent malformed JSON");
            errors::internal_error()
        }
    }
}

/// Like [`relay_json`], but an unreadable success body becomes `{}`.
async fn relay_ack(
    request: RequestBuilder,
    operation: &'static str,
    fallback: &'static str,
) -> axum::response::Response {
    let Some((status, body)) = fetch(request, operation).await else {
        return errors::internal_error();
    };
    if !status.is_success() {
        return errors::upstream_error(status, &body, fallback);
    }

    let value = serde_json::from_slice::<serde_json::Value>(&body).unwrap_or_else(|_| json!({}));
    (status, Json(value)).into_response()
}

async fn fetch(request: RequestBuilder, operation: &'static str) -> Option<(StatusCode, Bytes)> {
    let response = services::send(request, operation).await.ok()?;
    let status = errors::relay_status(response.status());
    match response.bytes().await {
        Ok(body) => Some((status, body)),
        Err(e) => {
            tracing::error!(operation, error = %e, "failed to read export backend response");
            None
        }
    }
}
