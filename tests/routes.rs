//! Route-level behaviour of the HTTP API against the in-memory store.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{
    body_json, body_text, build_app, config_with, get, mock_blob, mock_finding, mock_openai,
    mock_unavailable, multipart_body, post_json, post_multipart, post_raw,
};
use crosslist_api::config::AppConfig;
use serde_json::json;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Service endpoints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_memory_store() {
    let response = get(build_app(AppConfig::offline()), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "crosslist-api");
    assert_eq!(json["store"], "memory");
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let response = get(build_app(AppConfig::offline()), "/api/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn metrics_require_key_when_configured() {
    let mut config = AppConfig::offline();
    config.metrics_key = Some("m-secret".into());
    let app = build_app(config);

    let denied = get(app.clone(), "/metrics").await;
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let allowed = app
        .oneshot(
            Request::get("/metrics")
                .header("X-Metrics-Key", "m-secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn openapi_document_lists_batch_routes() {
    let response = get(build_app(AppConfig::offline()), "/openapi.json").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["openapi"], "3.0.3");
    assert!(json["paths"]["/api/batches/assign"].is_object());
}

#[tokio::test]
async fn openapi_respects_docs_key() {
    let mut config = AppConfig::offline();
    config.openapi_key = Some("d-secret".into());
    let response = get(build_app(config), "/openapi.json").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn docs_page_is_html() {
    let response = get(build_app(AppConfig::offline()), "/docs").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("swagger-ui"));
}

// ---------------------------------------------------------------------------
// Listing generation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn listing_without_key_is_config_error() {
    let response = post_json(
        build_app(AppConfig::offline()),
        "/api/ai/listing",
        json!({"sku": "SKU-1", "images": ["https://cdn.example.com/1.jpg"]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Missing OpenAI API key");
}

#[tokio::test]
async fn listing_requires_sku_and_http_images() {
    let app = build_app(AppConfig::offline());
    let missing_sku = post_json(app.clone(), "/api/ai/listing", json!({"images": []})).await;
    assert_eq!(missing_sku.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(missing_sku).await["error"], "Missing sku");

    let bad_url = post_json(
        app,
        "/api/ai/listing",
        json!({"sku": "SKU-1", "images": ["file:///tmp/a.jpg"]}),
    )
    .await;
    assert_eq!(bad_url.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn listing_mock_mode_skips_openai() {
    let mut config = AppConfig::offline();
    config.vision.mock_mode = true;
    let response = post_json(build_app(config), "/api/ai/listing", json!({"sku": "SKU-7"})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["title"], "Example Listing for SKU-7");
    assert_eq!(json["category"], "Apparel");
    assert_eq!(json["price"], "25.00");
    assert_eq!(json["average"], "28.00");
}

#[tokio::test]
async fn listing_parses_json_reply() {
    let openai = mock_openai(
        r#"{"title":"Nike Air Max 90","description":"Size 10, light wear","category":"Sneakers","condition":"Used","price":45,"average":"52.5"}"#,
    )
    .await;
    let app = build_app(config_with(Some(openai), None, None));
    let response = post_json(
        app,
        "/api/ai/listing",
        json!({"sku": "SKU-1042", "images": ["https://cdn.example.com/1.jpg"]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["title"], "Nike Air Max 90");
    assert_eq!(json["price"], "45.00");
    assert_eq!(json["average"], "52.50");
}

#[tokio::test]
async fn listing_prose_reply_becomes_fallback_draft() {
    let reply = "I think this is a vintage denim jacket in good shape.";
    let openai = mock_openai(reply).await;
    let app = build_app(config_with(Some(openai), None, None));
    let response = post_json(
        app,
        "/api/ai/listing",
        json!({"sku": "SKU-1042", "images": ["https://cdn.example.com/1.jpg"]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["description"], reply);
    assert_eq!(json["category"], "Clothing");
    assert_eq!(json["condition"], "Pre-owned");
    assert_eq!(json["price"], "25.00");
}

#[tokio::test]
async fn listing_openai_outage_is_generic_500() {
    let openai = mock_unavailable().await;
    let app = build_app(config_with(Some(openai), None, None));
    let response = post_json(
        app,
        "/api/ai/listing",
        json!({"sku": "SKU-1042", "images": ["https://cdn.example.com/1.jpg"]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "AI generation failed");
    assert_eq!(json["detail"], "listing");
}

#[tokio::test]
async fn listing_malformed_body_is_bad_request() {
    let app = build_app(AppConfig::offline());
    let response = post_raw(
        app.clone(),
        "/api/ai/listing",
        Some("application/json"),
        "{\"sku\": ",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await["error"].as_str().unwrap().to_string();
    assert!(error.starts_with("Invalid JSON body"), "{error}");

    let response = post_raw(app, "/api/ai/listing", Some("text/plain"), "SKU-1").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

// ---------------------------------------------------------------------------
// Comps
// ---------------------------------------------------------------------------

#[tokio::test]
async fn comps_require_title() {
    let response = post_json(build_app(AppConfig::offline()), "/api/ebay/comps", json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Missing title");
}

#[tokio::test]
async fn comps_without_readable_body_ask_for_title() {
    let app = build_app(AppConfig::offline());
    let no_body = post_raw(app.clone(), "/api/ebay/comps", None, "").await;
    assert_eq!(no_body.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(no_body).await["error"], "Missing title");

    let numeric = post_json(app, "/api/ebay/comps", json!({"title": 42})).await;
    assert_eq!(numeric.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(numeric).await["error"], "Missing title");
}

#[tokio::test]
async fn comps_finding_outage_is_generic_500() {
    let finding = mock_unavailable().await;
    let app = build_app(config_with(None, Some(finding), None));
    let response = post_json(app, "/api/ebay/comps", json!({"title": "Nike Air Max"})).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Failed to fetch comps");
    assert_eq!(json["detail"], "comps");
}

#[tokio::test]
async fn comps_without_app_id_is_config_error() {
    let response = post_json(
        build_app(AppConfig::offline()),
        "/api/ebay/comps",
        json!({"title": "Nike Air Max"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Missing EBAY_APP_ID");
}

#[tokio::test]
async fn comps_average_sold_prices() {
    let finding = mock_finding(&["20.0", "22.0", "24.0"]).await;
    let app = build_app(config_with(None, Some(finding), None));
    let response = post_json(app, "/api/ebay/comps", json!({"title": "Nike Air Max"})).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"average": "22.00", "quickSale": "19.80", "count": 3})
    );
}

#[tokio::test]
async fn comps_without_sales_return_sentinel() {
    let finding = mock_finding(&["0.0", "n/a"]).await;
    let app = build_app(config_with(None, Some(finding), None));
    let response = post_json(app, "/api/ebay/comps", json!({"title": "Obscure thing"})).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"average": "-", "quickSale": "-", "count": 0})
    );
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_without_storage_is_config_error() {
    let body = multipart_body("file", "shoe.jpg", "image/jpeg", b"\xff\xd8\xff");
    let response = post_multipart(build_app(AppConfig::offline()), "/api/upload", body).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Missing storage credentials");
}

#[tokio::test]
async fn upload_rejects_missing_and_non_image_files() {
    let app = build_app(AppConfig::offline());
    let wrong_field = multipart_body("photo", "shoe.jpg", "image/jpeg", b"\xff\xd8");
    let response = post_multipart(app.clone(), "/api/upload", wrong_field).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Missing file");

    let text = multipart_body("file", "notes.txt", "text/plain", b"hello");
    let response = post_multipart(app.clone(), "/api/upload", text).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let empty = multipart_body("file", "shoe.jpg", "image/jpeg", b"");
    let response = post_multipart(app, "/api/upload", empty).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_and_delete_through_blob_store() {
    let (blob, log) = mock_blob().await;
    let app = build_app(config_with(None, None, Some(blob)));
    let body = multipart_body("file", "red shoe.jpg", "image/jpeg", b"\xff\xd8\xff");
    let response = post_multipart(app.clone(), "/api/upload", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let url = json["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("https://blob.test/crosslist/"));
    assert!(url.ends_with("-red-shoe.jpg"));
    assert_eq!(json["id"], url);

    let response = app
        .oneshot(
            Request::delete(format!("/api/upload?id={}", urlencoding::encode(&url)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(log.deleted(), vec![url]);
}

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

#[tokio::test]
async fn batch_store_starts_empty() {
    let app = build_app(AppConfig::offline());
    let list = get(app.clone(), "/api/batches").await;
    assert_eq!(list.status(), StatusCode::OK);
    assert_eq!(body_json(list).await, json!([]));

    let counter = get(app, "/api/batches?lastSku=1").await;
    assert_eq!(body_json(counter).await, json!({"lastSku": null}));
}

#[tokio::test]
async fn last_sku_round_trips() {
    let app = build_app(AppConfig::offline());
    let saved = post_json(app.clone(), "/api/batches?lastSku=1", json!({"value": "SKU-1042"})).await;
    assert_eq!(saved.status(), StatusCode::OK);
    assert_eq!(body_json(saved).await, json!({"ok": true}));

    let counter = get(app.clone(), "/api/batches?lastSku=1").await;
    assert_eq!(body_json(counter).await["lastSku"], "SKU-1042");

    let invalid = post_json(app, "/api/batches?lastSku=1", json!({"value": "NODIGITS"})).await;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn batch_upsert_echoes_and_keeps_files() {
    let app = build_app(AppConfig::offline());
    let batch = json!({
        "sku": "SKU-9",
        "files": ["https://cdn.example.com/a.jpg", "https://cdn.example.com/b.jpg"],
        "status": "staged"
    });
    let saved = post_json(app.clone(), "/api/batches", batch.clone()).await;
    assert_eq!(saved.status(), StatusCode::OK);
    assert_eq!(body_json(saved).await, batch);

    let mut ready = batch.clone();
    ready["status"] = json!("ready");
    ready["ai"] = json!({"title": "Canvas tote", "price": "12.5"});
    post_json(app.clone(), "/api/batches", ready).await;

    let shown = body_json(get(app.clone(), "/api/batches/SKU-9").await).await;
    assert_eq!(shown["files"], batch["files"]);
    assert_eq!(shown["status"], "ready");
    assert_eq!(shown["ai"]["price"], "12.50");

    let missing = get(app, "/api/batches/SKU-404").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn batch_list_is_ordered_by_sku() {
    let app = build_app(AppConfig::offline());
    for sku in ["SKU-100", "SKU-20", "SKU-3"] {
        post_json(app.clone(), "/api/batches", json!({"sku": sku, "files": []})).await;
    }
    let list = body_json(get(app, "/api/batches").await).await;
    let skus: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["sku"].as_str().unwrap())
        .collect();
    assert_eq!(skus, vec!["SKU-3", "SKU-20", "SKU-100"]);
}

#[tokio::test]
async fn assign_creates_batch_and_advances_counter_once() {
    let app = build_app(AppConfig::offline());
    let request = json!({"sku": "SKU-1099", "files": ["https://cdn.example.com/a.jpg"]});

    let first = post_json(app.clone(), "/api/batches/assign", request.clone()).await;
    assert_eq!(first.status(), StatusCode::OK);
    let json = body_json(first).await;
    assert_eq!(json["nextSku"], "SKU-1100");
    assert_eq!(json["batch"]["status"], "staged");

    let second = post_json(app.clone(), "/api/batches/assign", request).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let counter = body_json(get(app.clone(), "/api/batches?lastSku=1").await).await;
    assert_eq!(counter["lastSku"], "SKU-1100");
    let list = body_json(get(app, "/api/batches").await).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn assign_rejects_empty_selection() {
    let response = post_json(
        build_app(AppConfig::offline()),
        "/api/batches/assign",
        json!({"sku": "SKU-1", "files": []}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn assign_without_files_field_is_bad_request() {
    let response = post_json(
        build_app(AppConfig::offline()),
        "/api/batches/assign",
        json!({"sku": "SKU-1"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    let error = json["error"].as_str().unwrap();
    assert!(error.starts_with("Invalid JSON body"), "{error}");
    assert!(error.contains("files"), "{error}");
}

#[tokio::test]
async fn batch_upsert_rejects_non_json_body() {
    let response = post_raw(
        build_app(AppConfig::offline()),
        "/api/batches",
        Some("application/json"),
        "not json",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}
