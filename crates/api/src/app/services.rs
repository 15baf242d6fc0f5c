use reqwest::{RequestBuilder, Response, Url};

use crate::config::ProxySettings;

#[derive(Debug, thiserror::Error)]
pub enum ServicesError {
    #[error("invalid backend URL {url:?}: {reason}")]
    InvalidBackendUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Connection to the export backend, shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppServices {
    http: reqwest::Client,
    backend_url: Url,
}

pub fn build_services(settings: &ProxySettings) -> Result<AppServices, ServicesError> {
    let invalid = |reason: String| ServicesError::InvalidBackendUrl {
        url: settings.backend_url.clone(),
        reason,
    };

    let backend_url = Url::parse(settings.backend_url.trim()).map_err(|e| invalid(e.to_string()))?;
    if backend_url.cannot_be_a_base() {
        return Err(invalid("not a base URL".to_string()));
    }

    let http = reqwest::Client::builder()
        .timeout(settings.request_timeout())
        .build()?;

    tracing::info!(backend = %backend_url, "export backend configured");
    Ok(AppServices { http, backend_url })
}

impl AppServices {
    /// Backend URL for `segments`, each percent-encoded as one path segment.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.backend_url.clone();
        // Checked at construction: the base URL can carry a path.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub fn get(&self, segments: &[&str]) -> RequestBuilder {
        self.http.get(self.endpoint(segments))
    }

    pub fn post(&self, segments: &[&str]) -> RequestBuilder {
        self.http.post(self.endpoint(segments))
    }

    pub fn delete(&self, segments: &[&str]) -> RequestBuilder {
        self.http.delete(self.endpoint(segments))
    }
}

/// Send to the backend; transport failures are logged here.
pub async fn send(request: RequestBuilder, operation: &'static str) -> Result<Response, reqwest::Error> {
    request.send().await.inspect_err(|e| {
        tracing::error!(operation, error = %e, "export backend unreachable");
    })
}
