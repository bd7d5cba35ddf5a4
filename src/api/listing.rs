use super::{ApiJson, AppState};
use crate::error::ServiceError;
use crate::llm::{DraftOutcome, mock_draft};
use crate::models::{ListingDraft, ListingRequest};
use axum::{Json, extract::State};
use tracing::{info, warn};

/// Draft a listing from a batch's photos.
///
/// - Method: `POST`
/// - Path: `/api/ai/listing`
/// - Body: `ListingRequest` (`{sku, images}`)
/// - Response: `ListingDraft`
///
/// A reply the model did not format as JSON still answers 200 with the
/// fallback draft.
pub async fn generate_listing(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ListingRequest>,
) -> Result<Json<ListingDraft>, ServiceError> {
    crate::metrics::inc_requests("/api/ai/listing");
    let sku = payload.sku.trim();
    if sku.is_empty() {
        return Err(ServiceError::invalid_input("listing", "Missing sku"));
    }
    if state.vision.mock_mode() {
        return Ok(Json(mock_draft(sku)));
    }
    if payload.images.is_empty() {
        return Err(ServiceError::invalid_input("listing", "Missing images"));
    }
    if let Some(bad) = payload
        .images
        .iter()
        .find(|url| !(url.starts_with("https://") || url.starts_with("http://")))
    {
        return Err(ServiceError::invalid_input(
            "listing",
            format!("Image must be an http(s) URL: {bad}"),
        ));
    }

    let outcome = state.vision.generate_listing(sku, &payload.images).await?;
    match &outcome {
        DraftOutcome::Parsed(draft) => {
            info!(target = "crosslist.api", sku, title = %draft.title, "listing_generated")
        }
        DraftOutcome::Fallback(_) => {
            warn!(target = "crosslist.api", sku, "listing_reply_not_json_using_fallback")
        }
    }
    Ok(Json(outcome.into_draft()))
}
