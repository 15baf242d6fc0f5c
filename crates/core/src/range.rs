//! Inclusive calendar date range of an export.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ExportError, ExportResult};
use crate::value_object::ValueObject;

/// Wire format of a date parameter.
pub const DATE_PARAM_FORMAT: &str = "%Y-%m-%d";

/// Inclusive `[from, to]` range. Construction enforces `from <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl ValueObject for DateRange {}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> ExportResult<Self> {
        if to < from {
            return Err(ExportError::validation("End date cannot be before start date"));
        }
        Ok(Self { from, to })
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

    pub fn from_param(&self) -> String {
        self.from.format(DATE_PARAM_FORMAT).to_string()
    }

    pub fn to_param(&self) -> String {
        self.to.format(DATE_PARAM_FORMAT).to_string()
    }

    /// `export_<YYYYMMDD>_to_<YYYYMMDD>.xlsx`
    pub fn export_filename(&self) -> String {
        format!(
            "export_{}_to_{}.xlsx",
            self.from.format("%Y%m%d"),
            self.to.format("%Y%m%d")
        )
    }
}

/// Parse a strict `YYYY-MM-DD` parameter.
///
/// chrono alone accepts signed and short years, so the shape is checked first.
pub fn parse_date_param(raw: &str) -> ExportResult<NaiveDate> {
    let invalid = || ExportError::validation("Invalid date format. Expected YYYY-MM-DD");

    let bytes = raw.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(raw, DATE_PARAM_FORMAT).map_err(|_| invalid())
}
