use super::{ApiJson, AppState};
use crate::error::ServiceError;
use crate::models::{CompsRequest, CompsSummary};
use axum::{Json, extract::State};

/// Sold-price comparables for a title.
///
/// - Method: `POST`
/// - Path: `/api/ebay/comps`
/// - Body: `{title}`
/// - Response: `{average, quickSale, count}`
///
/// An absent or unreadable body is treated as `{}` and so answers
/// "Missing title".
pub async fn find_comps(
    State(state): State<AppState>,
    payload: Result<ApiJson<CompsRequest>, ServiceError>,
) -> Result<Json<CompsSummary>, ServiceError> {
    crate::metrics::inc_requests("/api/ebay/comps");
    let payload = payload.map(|ApiJson(p)| p).unwrap_or_default();
    let title = payload
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ServiceError::invalid_input("comps", "Missing title"))?;
    let summary = state.finding.find_comps(title).await?;
    Ok(Json(summary))
}
