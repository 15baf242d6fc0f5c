//! Strongly-typed identifiers used across the client.
//!
//! Both identifiers are opaque strings chosen outside the client: job ids are
//! assigned by the backend queue, tenant ids by the telemetry platform.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::ExportError;

/// Identifier of an export job (assigned by the backend at creation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

/// Identifier of a tenant. Absence means "all tenants".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

macro_rules! impl_string_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Wrap a value coming from a trusted source (e.g. a backend response).
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = ExportError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ExportError::validation(format!("{} is required", $name)));
                }
                Ok(Self(trimmed.to_string()))
            }
        }
    };
}

impl_string_newtype!(JobId, "Job ID");
impl_string_newtype!(TenantId, "Tenant ID");

impl TenantId {
    /// Parse optional user input: surrounding whitespace is dropped and a value
    /// that is empty after trimming means "no tenant".
    pub fn from_input(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|s| s.parse().ok())
    }

    /// Shortened form for narrow table cells; the full value stays available
    /// through [`TenantId::as_str`].
    pub fn truncated(&self, max_chars: usize) -> String {
        if self.0.chars().count() <= max_chars {
            return self.0.clone();
        }
        let mut short: String = self.0.chars().take(max_chars).collect();
        short.push('…');
        short
    }
}
