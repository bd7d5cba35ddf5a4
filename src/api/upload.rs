use super::AppState;
use crate::error::ServiceError;
use crate::models::{OkResponse, UploadResponse};
use crate::storage::UploadFile;
use axum::{
    Json,
    extract::{Multipart, Query, State},
};
use serde::Deserialize;
use tracing::{debug, info};

const FILE_FIELD: &str = "file";

/// Store one photo.
///
/// - Method: `POST`
/// - Path: `/api/upload`
/// - Body: `multipart/form-data` with a `file` field
/// - Response: `{url, id}`
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ServiceError> {
    crate::metrics::inc_requests("/api/upload");
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ServiceError::invalid_input("upload", format!("Invalid upload: {err}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ServiceError::invalid_input("upload", format!("Invalid upload: {err}")))?;
        upload = Some(UploadFile::new(file_name, content_type.as_deref(), bytes.to_vec()));
        break;
    }

    let file = upload.ok_or_else(|| ServiceError::invalid_input("upload", "Missing file"))?;
    if file.bytes.is_empty() {
        return Err(ServiceError::invalid_input("upload", "Empty file"));
    }
    if let Some(content_type) = &file.content_type {
        if !content_type.starts_with("image/") {
            return Err(ServiceError::invalid_input(
                "upload",
                format!("Only images can be uploaded, got {content_type}"),
            ));
        }
    }

    debug!(target = "crosslist.api", file = %file.file_name, bytes = file.bytes.len(), backend = state.files.backend_name(), "upload_received");
    let stored = state.files.store(&file).await?;
    info!(target = "crosslist.api", id = %stored.id, "upload_stored");
    Ok(Json(UploadResponse {
        url: stored.url,
        id: stored.id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    id: Option<String>,
}

/// Remove a stored photo that never made it into a batch.
///
/// - Method: `DELETE`
/// - Path: `/api/upload?id=<id>`
pub async fn delete_file(
    State(state): State<AppState>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<OkResponse>, ServiceError> {
    crate::metrics::inc_requests("/api/upload#delete");
    let id = query
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ServiceError::invalid_input("upload", "Missing id"))?;
    state.files.delete(id).await?;
    info!(target = "crosslist.api", id, "upload_deleted");
    Ok(Json(OkResponse { ok: true }))
}
