mod batches;
mod comps;
mod extract;
mod listing;
mod upload;

pub use extract::ApiJson;

use crate::config::AppConfig;
use crate::ebay::FindingClient;
use crate::error::ServiceError;
use crate::llm::VisionClient;
use crate::storage::FileStore;
use crate::store::{BatchStore, StoreError};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use once_cell::sync::Lazy;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};

pub const SERVICE_NAME: &str = "crosslist-api";

const OPENAPI_YAML: &str = include_str!("../../docs/openapi.yaml");

static OPENAPI: Lazy<Value> = Lazy::new(|| {
    openapi_document().unwrap_or_else(|err| {
        error!(target = "crosslist.api", error = %err, "openapi_document_invalid");
        json!({"openapi": "3.0.3"})
    })
});

/// The bundled OpenAPI document, parsed from YAML.
pub fn openapi_document() -> Result<Value, serde_yaml::Error> {
    serde_yaml::from_str(OPENAPI_YAML)
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: BatchStore,
    pub vision: Arc<VisionClient>,
    pub finding: Arc<FindingClient>,
    pub files: FileStore,
    pub prometheus: PrometheusHandle,
}

impl AppState {
    pub fn from_config(config: AppConfig, prometheus: PrometheusHandle) -> Result<Self, StoreError> {
        let store = BatchStore::from_url(config.redis_url.as_deref())?;
        Ok(Self {
            vision: Arc::new(VisionClient::new(config.vision.clone())),
            finding: Arc::new(FindingClient::new(config.finding.clone())),
            files: FileStore::from_config(&config.storage),
            config: Arc::new(config),
            store,
            prometheus,
        })
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_headers(Any)
        .allow_methods(Any)
        .allow_origin(Any);
    let body_limit = state.config.request_max_bytes;

    let api = Router::new()
        .route("/ai/listing", post(listing::generate_listing))
        .route("/ebay/comps", post(comps::find_comps))
        .route("/upload", post(upload::upload_file).delete(upload::delete_file))
        .route(
            "/batches",
            get(batches::read_batches).post(batches::write_batches),
        )
        .route("/batches/assign", post(batches::assign_batch))
        .route("/batches/{sku}", get(batches::show_batch));

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(swagger_ui))
        .nest("/api", api)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit))
}

/// Liveness plus a round trip to the batch store.
///
/// - Method: `GET`
/// - Path: `/health`
///
/// `{status, service, store}`; 503 with `status: "degraded"` when the store
/// does not answer.
async fn health(State(state): State<AppState>) -> Response {
    let backend = state.store.backend_name();
    match state.store.ping().await {
        Ok(()) => Json(json!({
            "status": "ok",
            "service": SERVICE_NAME,
            "store": backend,
        }))
        .into_response(),
        Err(err) => {
            warn!(target = "crosslist.api", store = backend, error = %err, "health_store_unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "service": SERVICE_NAME,
                    "store": backend,
                })),
            )
                .into_response()
        }
    }
}

async fn openapi_json(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ServiceError> {
    if let Some(key) = &state.config.openapi_key {
        if presented(&headers, "X-Docs-Key") != key.as_str() {
            return Err(ServiceError::unauthorized("docs"));
        }
    }
    Ok(Json((*OPENAPI).clone()))
}

async fn swagger_ui() -> Html<&'static str> {
    Html(
        r#"<!doctype html>
<html>
<head>
  <meta charset='utf-8'/>
  <title>CrossList API Docs</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.onload = () => {
      window.ui = SwaggerUIBundle({ url: '/openapi.json', dom_id: '#swagger-ui' });
    };
  </script>
</body>
</html>"#,
    )
}

async fn metrics_endpoint(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(secret) = &state.config.metrics_key {
        if presented(&headers, "X-Metrics-Key") != secret.as_str() {
            return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
        }
    }
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.prometheus.render(),
    )
        .into_response()
}

fn presented<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}
