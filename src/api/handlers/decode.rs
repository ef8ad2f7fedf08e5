//! Handler for the short URL resolution endpoint.

use axum::{Json, extract::State};

use crate::api::dto::decode::{DecodeRequest, DecodeResponse};
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::extract_code::extract_code;

/// Resolves a short URL to its original long URL.
///
/// # Endpoint
///
/// `POST /api/decode`
///
/// # Request Body
///
/// ```json
/// { "shortUrl": "https://sho.rt/abc123" }
/// ```
///
/// A bare code (`"abc123"`) is accepted as well. Resolution does not count as
/// a visit; only the redirect endpoint does.
///
/// # Errors
///
/// Returns 404 Not Found if the code is unknown.
pub async fn decode_handler(
    State(state): State<AppState>,
    Json(payload): Json<DecodeRequest>,
) -> Result<Json<DecodeResponse>, AppError> {
    let code = extract_code(&payload.short_url);

    let long_url = state.url_service.decode(&code).await?;

    Ok(Json(DecodeResponse { long_url }))
}
