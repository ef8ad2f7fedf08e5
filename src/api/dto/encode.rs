//! DTOs for the encode endpoint.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to shorten a long URL.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EncodeRequest {
    /// The original URL to shorten.
    #[validate(url(message = "Invalid URL format"))]
    pub long_url: String,
}

/// Response carrying the short URL for the submitted long URL.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeResponse {
    pub short_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_url_passes_validation() {
        let request = EncodeRequest {
            long_url: "https://example.com/some/path".to_string(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_invalid_url_fails_validation() {
        let request = EncodeRequest {
            long_url: "not-a-url".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_request_uses_camel_case() {
        let request: EncodeRequest =
            serde_json::from_str(r#"{"longUrl": "https://example.com"}"#).unwrap();
        assert_eq!(request.long_url, "https://example.com");
    }

    #[test]
    fn test_response_uses_camel_case() {
        let response = EncodeResponse {
            short_url: "https://sho.rt/abc123".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["shortUrl"], "https://sho.rt/abc123");
    }
}
