use std::sync::Arc;

use axum::extract::Extension;

use crate::app::routes::exports::relay_json;
use crate::app::services::AppServices;

pub async fn list_tenants(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    relay_json(services.get(&["tenants"]), "list_tenants", "Failed to fetch tenants data").await
}
