use std::ops::RangeInclusive;
use std::time::Duration;

use serde::Deserialize;
use telexport_observability::LogFormat;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_PAGE_SIZE: usize = 10;
const POLL_INTERVAL_BOUNDS: RangeInclusive<u64> = 10..=600;

/// Client configuration.
///
/// Loading order (later sources override earlier):
/// 1. `telexport.toml` in the working directory (optional)
/// 2. Environment variables with the `TELEXPORT_` prefix, e.g.
///    `TELEXPORT_BACKEND_URL`, `TELEXPORT_POLL_INTERVAL_SECS`
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    pub backend_url: String,

    /// Base URL for file downloads; defaults to `backend_url`.
    #[serde(default)]
    pub download_url: Option<String>,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default)]
    pub log_format: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_request_timeout() -> u64 {
    30
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl ClientSettings {
    pub fn load() -> Result<Self, SettingsError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("telexport").required(false))
            .add_source(
                config::Environment::with_prefix("TELEXPORT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let settings: Self = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Build settings from explicit key/value pairs only (no files, no env).
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Result<Self, SettingsError> {
        let mut builder = config::Config::builder();
        for (key, value) in pairs {
            builder = builder.set_override(*key, *value)?;
        }
        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.backend_url.trim().is_empty() {
            return Err(SettingsError::MissingRequired(
                "TELEXPORT_BACKEND_URL must be set".to_string(),
            ));
        }

        if !POLL_INTERVAL_BOUNDS.contains(&self.poll_interval_secs) {
            return Err(SettingsError::InvalidValue(format!(
                "poll interval must be between {} and {} seconds, got {}",
                POLL_INTERVAL_BOUNDS.start(),
                POLL_INTERVAL_BOUNDS.end(),
                self.poll_interval_secs
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "request timeout cannot be 0".to_string(),
            ));
        }

        if self.page_size == 0 {
            return Err(SettingsError::InvalidValue(
                "page size cannot be 0".to_string(),
            ));
        }

        self.log_format()?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn download_base(&self) -> &str {
        self.download_url.as_deref().unwrap_or(&self.backend_url)
    }

    pub fn log_format(&self) -> Result<LogFormat, SettingsError> {
        match self.log_format.as_deref() {
            None => Ok(LogFormat::default()),
            Some(raw) => raw.parse().map_err(SettingsError::InvalidValue),
        }
    }
}
