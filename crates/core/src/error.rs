//! Export error model.

use thiserror::Error;

/// Result type used across the export client.
pub type ExportResult<T> = Result<T, ExportError>;

/// Export-level error.
///
/// `Display` renders the user-facing message only, so the value can go straight
/// into a toast or an inline banner.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExportError {
    /// Bad or missing input, caught before any network call.
    #[error("{0}")]
    Validation(String),

    /// The backend answered with a non-2xx status, or with a body that could not
    /// be understood.
    #[error("{message}")]
    Gateway {
        status: Option<u16>,
        message: String,
    },

    /// The backend could not be reached at all.
    #[error("{0}")]
    Transport(String),
}

impl ExportError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn gateway(status: u16, msg: impl Into<String>) -> Self {
        Self::Gateway {
            status: Some(status),
            message: msg.into(),
        }
    }

    /// A 2xx response whose body did not have the expected shape.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Gateway {
            status: None,
            message: msg.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// HTTP status reported by the backend, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Gateway { status, .. } => *status,
            _ => None,
        }
    }

    pub fn user_message(&self) -> &str {
        match self {
            Self::Validation(msg) | Self::Transport(msg) => msg,
            Self::Gateway { message, .. } => message,
        }
    }

    /// Build a gateway error from a non-2xx backend answer.
    ///
    /// The message is the body's `detail`, else its `error`, else `fallback`.
    pub fn from_backend_body(status: u16, body: &[u8], fallback: &str) -> Self {
        let message = backend_message(body).unwrap_or_else(|| fallback.to_string());
        Self::gateway(status, message)
    }

    /// Short machine-readable kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Gateway { .. } => "gateway",
            Self::Transport(_) => "transport",
        }
    }
}

/// Extract a human-readable message from a backend error body.
///
/// Only string `detail` / `error` fields count: framework validation errors
/// put a list under `detail`, which is no use to a person.
pub fn backend_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    ["detail", "error"].iter().find_map(|key| {
        value
            .get(key)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|msg| !msg.is_empty())
            .map(str::to_string)
    })
}
