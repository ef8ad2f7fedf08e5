//! Handler for the URL shortening endpoint.

use axum::{Json, extract::State};
use validator::Validate;

use crate::api::dto::encode::{EncodeRequest, EncodeResponse};
use crate::error::AppError;
use crate::state::AppState;

/// Shortens a long URL.
///
/// # Endpoint
///
/// `POST /api/encode`
///
/// # Request Body
///
/// ```json
/// { "longUrl": "https://example.com/some/long/path" }
/// ```
///
/// # Response
///
/// ```json
/// { "shortUrl": "https://sho.rt/abc123" }
/// ```
///
/// Encoding is idempotent: submitting a URL that was already shortened returns
/// the existing short URL.
///
/// # Errors
///
/// Returns 400 Bad Request if the URL is syntactically invalid.
/// Returns 500 Internal Server Error if no free code could be allocated.
pub async fn encode_handler(
    State(state): State<AppState>,
    Json(payload): Json<EncodeRequest>,
) -> Result<Json<EncodeResponse>, AppError> {
    payload.validate()?;

    let record = state.url_service.encode(&payload.long_url).await?;

    Ok(Json(EncodeResponse {
        short_url: state.url_service.short_url(&record.short_code),
    }))
}
