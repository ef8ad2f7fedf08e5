//! Handler for URL search.

use axum::{
    Json,
    extract::{Query, State},
};
use serde_json::json;

use crate::api::dto::pagination::SearchParams;
use crate::api::dto::stats::ListResponse;
use crate::error::AppError;
use crate::state::AppState;

/// Searches shortened URLs by long URL text or short code substring.
///
/// # Endpoint
///
/// `GET /api/search`
///
/// # Query Parameters
///
/// - `query` (required): Search text, at least 3 characters
/// - `page` (optional): Page number (default: 1)
/// - `limit` (optional): Items per page (default: 10, max: 100)
///
/// Long URLs match by text relevance or substring, short codes by substring;
/// matching is case-insensitive and results are ranked by relevance. Counts
/// are live, as in the list endpoint.
///
/// # Errors
///
/// Returns 400 Bad Request for a query shorter than 3 characters or invalid
/// pagination.
pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ListResponse>, AppError> {
    let (page, limit) = params
        .pagination
        .resolve()
        .map_err(|e| AppError::bad_request(e, json!({})))?;

    let page = state
        .stats_service
        .search(&params.query, page, limit)
        .await?;

    Ok(Json(page.into()))
}
