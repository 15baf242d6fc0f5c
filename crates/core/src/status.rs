//! Job status vocabulary, normalization and action guards.
//!
//! The backend speaks a loose vocabulary (`done` for `completed`, `error` for
//! `failed`, transitional states such as `cancelling`). Everything is folded
//! into [`JobStatus`] at the deserialization boundary so that guard logic never
//! looks at raw strings. Statuses the client does not know are kept verbatim for
//! display but satisfy no guard.

use serde::{Deserialize, Serialize};

/// Canonical job status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
    /// Anything else the backend reported (kept as received, trimmed).
    Unknown(String),
}

/// Visual tone of a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTone {
    Active,
    Pending,
    Success,
    Danger,
    Neutral,
}

impl JobStatus {
    /// Normalize a backend status string (case-insensitive, synonyms folded).
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "queued" => Self::Queued,
            "running" => Self::Running,
            "completed" | "done" => Self::Completed,
            "failed" | "error" => Self::Failed,
            "cancelled" => Self::Cancelled,
            _ => Self::Unknown(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Unknown(raw) => raw,
        }
    }

    /// Human label: canonical states get fixed labels, unknown ones are
    /// Title-Cased.
    pub fn label(&self) -> String {
        match self {
            Self::Queued => "Queued".to_string(),
            Self::Running => "Running".to_string(),
            Self::Completed => "Completed".to_string(),
            Self::Failed => "Failed".to_string(),
            Self::Cancelled => "Cancelled".to_string(),
            Self::Unknown(raw) => title_case(raw),
        }
    }

    pub fn tone(&self) -> StatusTone {
        match self {
            Self::Running => StatusTone::Active,
            Self::Queued => StatusTone::Pending,
            Self::Completed => StatusTone::Success,
            Self::Failed => StatusTone::Danger,
            Self::Cancelled | Self::Unknown(_) => StatusTone::Neutral,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Only a completed export has a file to fetch.
    pub fn can_download(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Every known state except `running` may be deleted.
    pub fn can_delete(&self) -> bool {
        matches!(
            self,
            Self::Queued | Self::Completed | Self::Failed | Self::Cancelled
        )
    }

    /// Cancelling only makes sense before the job reached a terminal state.
    pub fn can_cancel(&self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        Self::normalize(&value)
    }
}

impl From<&str> for JobStatus {
    fn from(value: &str) -> Self {
        Self::normalize(value)
    }
}

impl From<JobStatus> for String {
    fn from(value: JobStatus) -> Self {
        value.as_str().to_string()
    }
}

impl core::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn title_case(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
