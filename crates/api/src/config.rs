use std::time::Duration;

use serde::Deserialize;
use telexport_observability::LogFormat;

/// Proxy configuration.
///
/// Loading order (later sources override earlier):
/// 1. built-in defaults
/// 2. `telexport-api.toml` in the working directory (optional)
/// 3. Environment variables with the `TELEXPORT_` prefix, e.g.
///    `TELEXPORT_BACKEND_URL`, `TELEXPORT_PORT`
#[derive(Debug, Clone, Deserialize)]
pub struct ProxySettings {
    pub backend_url: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

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

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

impl ProxySettings {
    pub fn load() -> Result<Self, SettingsError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("telexport-api").required(false))
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

    /// Settings pointing at `backend_url` with every other value defaulted.
    pub fn for_backend(backend_url: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into(),
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            log_format: None,
        }
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.backend_url.trim().is_empty() {
            return Err(SettingsError::MissingRequired(
                "TELEXPORT_BACKEND_URL must be set".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "request timeout cannot be 0".to_string(),
            ));
        }

        self.log_format()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn log_format(&self) -> Result<LogFormat, SettingsError> {
        match self.log_format.as_deref() {
            None => Ok(LogFormat::default()),
            Some(raw) => raw.parse().map_err(SettingsError::InvalidValue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = ProxySettings::for_backend("http://backend:8000");
        assert_eq!(settings.bind_addr(), "0.0.0.0:8080");
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn backend_url_is_required() {
        let settings = ProxySettings::for_backend("");
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::MissingRequired(_))
        ));
    }

    #[test]
    fn log_format_is_checked() {
        let mut settings = ProxySettings::for_backend("http://backend:8000");
        settings.log_format = Some("text".to_string());
        assert_eq!(settings.log_format().unwrap(), LogFormat::Text);

        settings.log_format = Some("yaml".to_string());
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidValue(_))
        ));
    }
}
