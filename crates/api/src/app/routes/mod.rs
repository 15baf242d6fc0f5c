use axum::{
    Router,
    routing::{get, post},
};

pub mod exports;
pub mod system;
pub mod tenants;

/// Router for every endpoint relayed to the export backend.
pub fn router() -> Router {
    Router::new()
        .route("/exports", get(exports::list_exports).post(exports::create_export))
        .route("/exports/:job_id", axum::routing::delete(exports::delete_export))
        .route("/exports/:job_id/cancel", post(exports::cancel_export))
        .route("/exports/:job_id/download", get(exports::download_export))
        .route("/tenants", get(tenants::list_tenants))
}
