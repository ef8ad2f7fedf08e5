//! Handler for per-link statistics.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::api::dto::stats::UrlStatsResponse;
use crate::error::AppError;
use crate::state::AppState;

/// Retrieves statistics for a specific short code.
///
/// # Endpoint
///
/// `GET /api/statistic/{code}`
///
/// # Response
///
/// The stored record with its live visit count: durable count plus whatever
/// is still buffered, and the freshest last-visited time from either store.
///
/// # Errors
///
/// Returns 404 Not Found if the short code doesn't exist.
pub async fn stats_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UrlStatsResponse>, AppError> {
    let stats = state.stats_service.get_stats(&code).await?;

    Ok(Json(stats.into()))
}
