use serde::Deserialize;

use telexport_core::range::parse_date_param;
use telexport_core::{DateRange, ExportError, ExportResult, TenantId};

/// Create-export input, accepted as a JSON body and/or query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateExportRequest {
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

/// Create input that is safe to forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCreate {
    pub range: DateRange,
    pub tenant_id: Option<TenantId>,
}

impl ValidatedCreate {
    /// Backend query parameters.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("date_from", self.range.from_param()),
            ("date_to", self.range.to_param()),
        ];
        if let Some(tenant) = &self.tenant_id {
            query.push(("tenant_id", tenant.to_string()));
        }
        query
    }
}

impl CreateExportRequest {
    /// Parse a JSON body; an empty body is an empty request.
    pub fn from_body(body: &[u8]) -> ExportResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|_| ExportError::validation("Invalid request body"))
    }

    /// Fill fields missing here from `other`.
    pub fn or(self, other: Self) -> Self {
        Self {
            date_from: self.date_from.or(other.date_from),
            date_to: self.date_to.or(other.date_to),
            tenant_id: self.tenant_id.or(other.tenant_id),
        }
    }

    pub fn validate(&self) -> ExportResult<ValidatedCreate> {
        fn present(v: &Option<String>) -> Option<&str> {
            v.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }

        let (Some(from), Some(to)) = (present(&self.date_from), present(&self.date_to)) else {
            return Err(ExportError::validation("Start date and End date are required"));
        };

        let range = DateRange::new(parse_date_param(from)?, parse_date_param(to)?)?;
        Ok(ValidatedCreate {
            range,
            tenant_id: TenantId::from_input(self.tenant_id.as_deref()),
        })
    }
}
