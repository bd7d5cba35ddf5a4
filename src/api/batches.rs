use super::{ApiJson, AppState};
use crate::error::ServiceError;
use crate::models::{
    AssignRequest, AssignResponse, Batch, LastSkuResponse, LastSkuWrite, OkResponse,
};
use crate::sku;
use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

/// `?lastSku` switches `/api/batches` from the batch list to the counter.
#[derive(Debug, Default, Deserialize)]
pub struct BatchQuery {
    #[serde(rename = "lastSku", default)]
    last_sku: Option<String>,
}

impl BatchQuery {
    fn targets_counter(&self) -> bool {
        match self.last_sku.as_deref().map(str::trim) {
            None => false,
            Some("0") | Some("false") => false,
            Some(_) => true,
        }
    }
}

fn bad_sku(err: sku::SkuError) -> ServiceError {
    ServiceError::invalid_input("batches", format!("Invalid sku: {err}"))
}

/// - `GET /api/batches` → `[Batch]` ordered by SKU
/// - `GET /api/batches?lastSku=1` → `{lastSku}`
pub async fn read_batches(
    State(state): State<AppState>,
    Query(query): Query<BatchQuery>,
) -> Result<Response, ServiceError> {
    crate::metrics::inc_requests("/api/batches#get");
    if query.targets_counter() {
        let last_sku = state.store.load_last_sku().await?;
        return Ok(Json(LastSkuResponse { last_sku }).into_response());
    }
    let batches = state.store.load_batches().await?;
    Ok(Json(batches).into_response())
}

/// - `POST /api/batches` with a `Batch` → the stored batch (whole-value upsert)
/// - `POST /api/batches?lastSku=1` with `{value}` → `{ok: true}`
pub async fn write_batches(
    State(state): State<AppState>,
    Query(query): Query<BatchQuery>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Response, ServiceError> {
    crate::metrics::inc_requests("/api/batches#post");
    if query.targets_counter() {
        let write: LastSkuWrite = serde_json::from_value(body)
            .map_err(|_| ServiceError::invalid_input("batches", "Missing value"))?;
        let value = sku::validate(&write.value).map_err(bad_sku)?;
        state.store.save_last_sku(&value).await?;
        info!(target = "crosslist.api", last_sku = %value, "last_sku_saved");
        return Ok(Json(OkResponse { ok: true }).into_response());
    }

    let mut batch: Batch = serde_json::from_value(body)
        .map_err(|err| ServiceError::invalid_input("batches", format!("Invalid batch: {err}")))?;
    batch.sku = sku::validate(&batch.sku).map_err(bad_sku)?;
    state.store.save_batch(&batch).await?;
    Ok(Json(batch).into_response())
}

/// Create a staged batch and advance the counter in one step.
///
/// - Method: `POST`
/// - Path: `/api/batches/assign`
/// - Body: `{sku, files}`
/// - Response: `{batch, nextSku}`; 409 when the SKU already has a batch
pub async fn assign_batch(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<AssignRequest>,
) -> Result<Json<AssignResponse>, ServiceError> {
    crate::metrics::inc_requests("/api/batches/assign");
    let sku = sku::validate(&payload.sku).map_err(bad_sku)?;
    if payload.files.is_empty() {
        return Err(ServiceError::invalid_input("batches", "No files to assign"));
    }
    let next_sku = sku::increment(&sku).map_err(bad_sku)?;
    let batch = Batch::staged(sku, payload.files);
    state.store.assign(&batch, &next_sku).await?;
    info!(target = "crosslist.api", sku = %batch.sku, files = batch.files.len(), next_sku = %next_sku, "batch_assigned");
    Ok(Json(AssignResponse { batch, next_sku }))
}

/// - `GET /api/batches/{sku}` → `Batch`, 404 when unknown
pub async fn show_batch(
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> Result<Json<Batch>, ServiceError> {
    crate::metrics::inc_requests("/api/batches/{sku}");
    state
        .store
        .load_batch(sku.trim())
        .await?
        .map(Json)
        .ok_or_else(|| ServiceError::not_found("batches", format!("Batch {sku} not found")))
}
