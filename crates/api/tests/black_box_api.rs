use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use reqwest::StatusCode;
use serde_json::json;
use telexport_api::config::ProxySettings;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn serve(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    /// Proxy (same router as prod) in front of `backend_url`.
    async fn proxy(backend_url: &str) -> Self {
        let app = telexport_api::app::build_app(&ProxySettings::for_backend(backend_url)).unwrap();
        Self::serve(app).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Default)]
struct Seen {
    create_queries: Vec<HashMap<String, String>>,
    paths: Vec<String>,
}

type Shared = Arc<Mutex<Seen>>;

async fn fake_backend() -> (TestServer, Shared) {
    let seen = Shared::default();
    let app = Router::new()
        .route(
            "/exports",
            get(|| async {
                Json(json!([{
                    "job_id": "j-1",
                    "status": "done",
                    "date_from": "2024-02-01",
                    "date_to": "2024-02-05",
                    "created_at": "2024-02-06T08:00:00"
                }]))
            })
            .post(
                |State(seen): State<Shared>, Query(q): Query<HashMap<String, String>>| async move {
                    seen.lock().unwrap().create_queries.push(q);
                    Json(json!({"job_id": "j-2", "status": "queued"}))
                },
            ),
        )
        .route(
            "/exports/:id",
            delete(|Path(id): Path<String>| async move {
                if id == "running" {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(json!({"error": "Cannot delete a running job"})),
                    )
                        .into_response();
                }
                Json(json!({"status": "deleted"})).into_response()
            }),
        )
        .route(
            "/exports/:id/cancel",
            post(|Path(id): Path<String>| async move {
                if id == "ghost" {
                    return (StatusCode::NOT_FOUND, Json(json!({"detail": "Job not found"})))
                        .into_response();
                }
                // Empty body: the proxy answers `{}`.
                StatusCode::OK.into_response()
            }),
        )
        .route(
            "/exports/:id/download",
            get(|State(seen): State<Shared>, Path(id): Path<String>| async move {
                seen.lock().unwrap().paths.push(id.clone());
                match id.as_str() {
                    "plain" => b"raw-bytes".to_vec().into_response(),
                    "pending" => (StatusCode::NOT_FOUND, "not json").into_response(),
                    _ => (
                        [
                            (header::CONTENT_TYPE, "application/octet-stream"),
                            (header::CONTENT_DISPOSITION, "attachment; filename='report.xlsx__'"),
                        ],
                        b"PK".to_vec(),
                    )
                        .into_response(),
                }
            }),
        )
        .route(
            "/tenants",
            get(|| async { Json(json!(["tenant-a", "tenant-b"])) }),
        )
        .with_state(seen.clone());

    (TestServer::serve(app).await, seen)
}

#[tokio::test]
async fn health_is_ok_without_backend() {
    let proxy = TestServer::proxy("http://127.0.0.1:9").await;
    let res = reqwest::get(format!("{}/health", proxy.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn list_is_relayed_verbatim() {
    let (backend, _) = fake_backend().await;
    let proxy = TestServer::proxy(&backend.base_url).await;

    let res = reqwest::get(format!("{}/exports", proxy.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body[0]["job_id"], "j-1");
    assert_eq!(body[0]["status"], "done");
}

#[tokio::test]
async fn create_validates_then_forwards_as_query() {
    let (backend, seen) = fake_backend().await;
    let proxy = TestServer::proxy(&backend.base_url).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/exports", proxy.base_url))
        .json(&json!({"date_from": "2024-03-01"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({"error": "Start date and End date are required"}));

    let res = client
        .post(format!("{}/exports", proxy.base_url))
        .json(&json!({"date_from": "03/01/2024", "date_to": "2024-03-02"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Invalid date format. Expected YYYY-MM-DD");
    assert!(seen.lock().unwrap().create_queries.is_empty());

    let res = client
        .post(format!("{}/exports", proxy.base_url))
        .json(&json!({"date_from": "2024-03-01", "date_to": "2024-03-02", "tenant_id": " t-1 "}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({"job_id": "j-2", "status": "queued"}));

    // Query-string form, as sent by the client gateway.
    let res = client
        .post(format!("{}/exports", proxy.base_url))
        .query(&[("date_from", "2024-04-01"), ("date_to", "2024-04-01")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.create_queries.len(), 2);
    assert_eq!(seen.create_queries[0]["date_from"], "2024-03-01");
    assert_eq!(seen.create_queries[0]["tenant_id"], "t-1");
    assert!(!seen.create_queries[1].contains_key("tenant_id"));
}

#[tokio::test]
async fn malformed_create_query_is_a_json_bad_request() {
    let (backend, seen) = fake_backend().await;
    let proxy = TestServer::proxy(&backend.base_url).await;

    let res = reqwest::Client::new()
        .post(format!(
            "{}/exports?date_from=2024-01-01&date_from=2024-01-02&date_to=2024-01-03",
            proxy.base_url
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        res.headers()[header::CONTENT_TYPE.as_str()],
        "application/json"
    );
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({"error": "Invalid request parameters"}));
    assert!(seen.lock().unwrap().create_queries.is_empty());
}

#[tokio::test]
async fn backend_errors_are_wrapped_with_their_status() {
    let (backend, _) = fake_backend().await;
    let proxy = TestServer::proxy(&backend.base_url).await;
    let client = reqwest::Client::new();

    let res = client
        .delete(format!("{}/exports/running", proxy.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({"error": "Cannot delete a running job"}));

    let res = client
        .post(format!("{}/exports/ghost/cancel", proxy.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({"error": "Job not found"}));

    let res = client
        .get(format!("{}/exports/pending/download", proxy.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({"error": "Failed to download file"}));
}

#[tokio::test]
async fn acks_are_relayed_even_when_empty() {
    let (backend, _) = fake_backend().await;
    let proxy = TestServer::proxy(&backend.base_url).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/exports/j-1/cancel", proxy.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({}));

    let res = client
        .delete(format!("{}/exports/j-1", proxy.base_url))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({"status": "deleted"}));
}

#[tokio::test]
async fn download_headers_are_cleaned_up() {
    let (backend, seen) = fake_backend().await;
    let proxy = TestServer::proxy(&backend.base_url).await;

    let res = reqwest::get(format!("{}/exports/j-1/download", proxy.base_url))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()[header::CONTENT_DISPOSITION.as_str()],
        "attachment; filename=\"report.xlsx\""
    );
    assert_eq!(
        res.headers()[header::CONTENT_TYPE.as_str()],
        "application/octet-stream"
    );
    assert_eq!(res.bytes().await.unwrap().as_ref(), b"PK");

    let res = reqwest::get(format!("{}/exports/plain/download", proxy.base_url))
        .await
        .unwrap();
    assert_eq!(
        res.headers()[header::CONTENT_DISPOSITION.as_str()],
        "attachment; filename=\"export-plain.xlsx\""
    );

    // Encoded once by the caller, decoded once by the proxy, re-encoded as one
    // segment for the backend.
    reqwest::get(format!("{}/exports/a%20b/download", proxy.base_url))
        .await
        .unwrap();
    assert_eq!(seen.lock().unwrap().paths.last().map(String::as_str), Some("a b"));
}

#[tokio::test]
async fn tenants_are_relayed() {
    let (backend, _) = fake_backend().await;
    let proxy = TestServer::proxy(&backend.base_url).await;

    let body: serde_json::Value = reqwest::get(format!("{}/tenants", proxy.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!(["tenant-a", "tenant-b"]));
}

#[tokio::test]
async fn unreachable_backend_is_internal_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let proxy = TestServer::proxy(&dead).await;
    let res = reqwest::get(format!("{}/exports", proxy.base_url)).await.unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({"error": "Internal server error"}));
}
