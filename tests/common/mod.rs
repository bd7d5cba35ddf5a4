#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{Request, Response, StatusCode};
use axum::routing::{get as get_route, post, put};
use axum::{Json, Router};
use crosslist_api::config::{AppConfig, BlobConfig, StorageConfig};
use crosslist_api::{AppState, router};
use http_body_util::BodyExt;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const BOUNDARY: &str = "crosslist-test-boundary";

/// A Prometheus handle that is not installed as the global recorder.
pub fn prometheus() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

pub fn build_app(config: AppConfig) -> Router {
    let state = AppState::from_config(config, prometheus()).expect("memory store");
    router(state)
}

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    format!("http://{addr}")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    app.oneshot(
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// POST with an arbitrary body and optional content type.
pub async fn post_raw(
    app: Router,
    uri: &str,
    content_type: Option<&str>,
    body: &'static str,
) -> Response<Body> {
    let mut request = Request::post(uri);
    if let Some(content_type) = content_type {
        request = request.header("content-type", content_type);
    }
    app.oneshot(request.body(Body::from(body)).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// A single-part `multipart/form-data` body.
pub fn multipart_body(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn post_multipart(app: Router, uri: &str, body: Vec<u8>) -> Response<Body> {
    app.oneshot(
        Request::post(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// OpenAI stand-in answering every completion with `reply` as content.
pub async fn mock_openai(reply: &'static str) -> String {
    let app = Router::new().route(
        "/chat/completions",
        post(move |Json(body): Json<Value>| async move {
            assert_eq!(body["response_format"]["type"], "json_object");
            Json(json!({
                "choices": [{"message": {"role": "assistant", "content": reply}}]
            }))
        }),
    );
    spawn(app).await
}

/// Finding API stand-in reporting one sold item per price.
pub async fn mock_finding(prices: &'static [&'static str]) -> String {
    let app = Router::new().route(
        "/",
        get_route(move || async move {
            let items: Vec<Value> = prices
                .iter()
                .map(|p| json!({"sellingStatus": [{"currentPrice": [{"@currencyId": "USD", "__value__": p}]}]}))
                .collect();
            Json(json!({
                "findCompletedItemsResponse": [{
                    "ack": ["Success"],
                    "searchResult": [{"@count": items.len().to_string(), "item": items}]
                }]
            }))
        }),
    );
    format!("{}/", spawn(app).await)
}

/// Upstream stand-in that answers 503 on every path, usable as the OpenAI
/// base URL or the Finding endpoint.
pub async fn mock_unavailable() -> String {
    let app = Router::new().fallback(|| async {
        (StatusCode::SERVICE_UNAVAILABLE, "upstream unavailable")
    });
    format!("{}/", spawn(app).await)
}

/// Records what a blob stand-in was asked to delete.
#[derive(Clone, Default)]
pub struct BlobLog {
    pub deleted: Arc<Mutex<Vec<String>>>,
}

impl BlobLog {
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

/// Vercel Blob stand-in. Any pathname containing `broken` fails with 500.
pub async fn mock_blob() -> (String, BlobLog) {
    let log = BlobLog::default();
    let app = Router::new()
        .route("/blob/{name}", put(blob_put).post(blob_delete))
        .with_state(log.clone());
    (format!("{}/blob", spawn(app).await), log)
}

async fn blob_put(Path(name): Path<String>) -> Result<Json<Value>, StatusCode> {
    if name.contains("broken") {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(Json(json!({
        "url": format!("https://blob.test/{name}"),
        "pathname": name,
    })))
}

async fn blob_delete(
    State(log): State<BlobLog>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> StatusCode {
    if name != "delete" {
        return StatusCode::NOT_FOUND;
    }
    let mut deleted = log.deleted.lock().unwrap();
    for url in body["urls"].as_array().into_iter().flatten() {
        deleted.push(url.as_str().unwrap_or_default().to_string());
    }
    StatusCode::OK
}

/// Offline config wired to whichever stand-ins a test started.
pub fn config_with(
    openai: Option<String>,
    finding: Option<String>,
    blob: Option<String>,
) -> AppConfig {
    let mut config = AppConfig::offline();
    if let Some(base) = openai {
        config.vision.api_key = Some("sk-test".into());
        config.vision.base_url = base;
    }
    if let Some(endpoint) = finding {
        config.finding.app_id = Some("app-test".into());
        config.finding.endpoint = endpoint;
    }
    if let Some(base) = blob {
        config.storage = StorageConfig::VercelBlob(BlobConfig {
            token: Some("blob-token".into()),
            base_url: base,
        });
    }
    config
}
