//! HTTP application wiring (Axum router + upstream wiring).
//!
//! - `services.rs`: the HTTP client for the export backend
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and input validation
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::config::ProxySettings;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(settings: &ProxySettings) -> Result<Router, services::ServicesError> {
    let services = Arc::new(services::build_services(settings)?);

    let proxied = routes::router().layer(Extension(services));

    Ok(Router::new()
        .route("/health", get(routes::system::health))
        .merge(proxied)
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::log_requests))))
}
