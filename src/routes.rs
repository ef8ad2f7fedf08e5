//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /{code}`               - Short link redirect (counts a visit)
//! - `GET  /health`               - Health check: database and cache
//! - `POST /api/encode`           - Shorten a long URL
//! - `POST /api/decode`           - Resolve a short URL (no visit counted)
//! - `GET  /api/statistic/{code}` - Live statistics for one link
//! - `GET  /api/list`             - Paginated listing, newest first
//! - `GET  /api/search`           - Text/substring search
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Path normalization** - Trailing slash handling

use crate::api::handlers::{
    decode_handler, encode_handler, health_handler, list_handler, redirect_handler,
    search_handler, stats_handler,
};
use crate::state::AppState;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower::Layer;
use tower_http::LatencyUnit;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Constructs the application router with all routes and middleware.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    let api_router = Router::new()
        .route("/encode", post(encode_handler))
        .route("/decode", post(decode_handler))
        .route("/statistic/{code}", get(stats_handler))
        .route("/list", get(list_handler))
        .route("/search", get(search_handler));

    let router = Router::new()
        .route("/{code}", get(redirect_handler))
        .route("/health", get(health_handler))
        .nest("/api", api_router)
        .fallback(fallback_handler)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .with_state(state);

    NormalizePathLayer::trim_trailing_slash().layer(router)
}

/// JSON 404 for unmatched routes.
async fn fallback_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Route not found" })),
    )
}
