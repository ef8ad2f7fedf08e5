//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its original URL.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Request Flow
///
/// 1. Resolve the code (redirect cache first, durable store on miss)
/// 2. Buffer a visit increment in the ephemeral store
/// 3. Return 307 Temporary Redirect
///
/// The visit is write-behind: the durable store sees nothing until the next
/// flush cycle, and a buffering failure never blocks the redirect itself.
///
/// # Errors
///
/// Returns 404 Not Found if the short code doesn't exist.
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let long_url = state.url_service.decode(&code).await?;

    if let Err(e) = state.stats_service.record_visit(&code).await {
        warn!("Visit for {} not counted: {}", code, e);
    }

    Ok(Redirect::temporary(&long_url))
}
