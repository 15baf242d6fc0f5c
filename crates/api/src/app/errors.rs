use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use telexport_core::backend_message;

/// `{"error": "<message>"}` with `status`.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, axum::Json(json!({ "error": message.into() }))).into_response()
}

/// The backend could not be reached or answered with garbage.
pub fn internal_error() -> axum::response::Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// Relay a non-2xx backend answer: same status, message from the body's
/// `detail` / `error`, else `fallback`.
pub fn upstream_error(status: StatusCode, body: &[u8], fallback: &str) -> axum::response::Response {
    let message = backend_message(body).unwrap_or_else(|| fallback.to_string());
    tracing::warn!(status = status.as_u16(), %message, "export backend rejected request");
    json_error(status, message)
}

/// Map a backend status onto ours; anything unrepresentable becomes 502.
pub fn relay_status(status: reqwest::StatusCode) -> StatusCode {
    StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY)
}
