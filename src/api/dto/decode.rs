//! DTOs for the decode endpoint.

use serde::{Deserialize, Serialize};

/// Request to resolve a short URL back to its original.
///
/// Accepts a full short URL or a bare short code.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeRequest {
    pub short_url: String,
}

/// Response carrying the resolved long URL.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeResponse {
    pub long_url: String,
}
