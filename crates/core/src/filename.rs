//! Download filename policy.
//!
//! The backend has been seen emitting extensions with trailing padding
//! (`export.xlsx__`), so every filename shown to the user goes through
//! [`normalize_extension`].

use crate::id::JobId;
use crate::range::DateRange;

pub const SPREADSHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Fallback filename when nothing better is known.
pub fn default_filename(job_id: &JobId) -> String {
    format!("export-{job_id}.xlsx")
}

/// Pick the filename presented to the user.
///
/// Preference order: the job's date range, the filename suggested by the
/// backend, then [`default_filename`].
pub fn resolve_download_filename(
    job_id: &JobId,
    range: Option<&DateRange>,
    suggested: Option<&str>,
) -> String {
    let name = match (range, suggested.map(str::trim).filter(|s| !s.is_empty())) {
        (Some(range), _) => range.export_filename(),
        (None, Some(suggested)) => suggested.to_string(),
        (None, None) => default_filename(job_id),
    };
    normalize_extension(&name)
}

/// Strip trailing non-alphanumeric padding from the extension:
/// `report.xlsx__` becomes `report.xlsx`.
///
/// Names without an extension, or whose extension continues with more
/// alphanumerics after the padding, are returned trimmed but otherwise intact.
pub fn normalize_extension(name: &str) -> String {
    let trimmed = name.trim();
    let Some(dot) = trimmed.rfind('.') else {
        return trimmed.to_string();
    };

    let ext = &trimmed[dot + 1..];
    let alnum_len = ext
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(ext.len());
    if alnum_len == 0 {
        return trimmed.to_string();
    }

    let padding = &ext[alnum_len..];
    if padding.chars().any(|c| c.is_ascii_alphanumeric()) {
        return trimmed.to_string();
    }

    trimmed[..dot + 1 + alnum_len].to_string()
}

/// Extract the (normalized) filename from a `Content-Disposition` value.
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    locate_filename(header).map(|(_, _, value)| normalize_extension(value))
}

/// Rewrite a `Content-Disposition` value so its filename is normalized and
/// quoted. A missing or filename-less header gets the default attachment name.
pub fn rewrite_content_disposition(header: Option<&str>, job_id: &JobId) -> String {
    let Some(header) = header else {
        return format!("attachment; filename=\"{}\"", default_filename(job_id));
    };

    match locate_filename(header) {
        Some((start, end, value)) => format!(
            "{}filename=\"{}\"{}",
            &header[..start],
            normalize_extension(value),
            &header[end..]
        ),
        None => header.to_string(),
    }
}

/// Find `filename=<value>` (case-insensitive, optionally quoted).
///
/// Returns the byte span of the whole parameter and the unquoted value.
fn locate_filename(header: &str) -> Option<(usize, usize, &str)> {
    const KEY: &str = "filename=";

    // ASCII lowercasing keeps byte offsets stable.
    let start = header.to_ascii_lowercase().find(KEY)?;
    let mut pos = start + KEY.len();
    let bytes = header.as_bytes();

    if matches!(bytes.get(pos), Some(b'"') | Some(b'\'')) {
        pos += 1;
    }
    let value_start = pos;
    while pos < bytes.len() && !matches!(bytes[pos], b'"' | b'\'' | b';') {
        pos += 1;
    }
    let value = header[value_start..pos].trim();
    if matches!(bytes.get(pos), Some(b'"') | Some(b'\'')) {
        pos += 1;
    }

    if value.is_empty() {
        return None;
    }
    Some((start, pos, value))
}
