//! Handler for paginated URL listing.

use axum::{
    Json,
    extract::{Query, State},
};
use serde_json::json;

use crate::api::dto::pagination::PageParams;
use crate::api::dto::stats::ListResponse;
use crate::error::AppError;
use crate::state::AppState;

/// Lists shortened URLs, newest first, with live visit counts.
///
/// # Endpoint
///
/// `GET /api/list`
///
/// # Query Parameters
///
/// - `page` (optional): Page number (default: 1)
/// - `limit` (optional): Items per page (default: 10, max: 100)
///
/// # Response
///
/// `{ total, page, limit, data }` where `total` is the full record count,
/// independent of the requested page.
///
/// # Errors
///
/// Returns 400 Bad Request if pagination parameters are invalid.
pub async fn list_handler(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<ListResponse>, AppError> {
    let (page, limit) = params
        .resolve()
        .map_err(|e| AppError::bad_request(e, json!({})))?;

    let page = state.stats_service.list(page, limit).await?;

    Ok(Json(page.into()))
}
