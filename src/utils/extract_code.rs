//! Short-code extraction from user-supplied short URLs.

/// Extracts the short code from a short URL or bare code.
///
/// The decode endpoint accepts either a full short URL
/// (`https://sho.rt/abc123`) or just the code (`abc123`). For a URL the last
/// non-empty path segment is the code; anything that does not parse as a URL is
/// treated as a bare code.
pub fn extract_code(short_url: &str) -> String {
    let trimmed = short_url.trim();

    if let Ok(parsed) = url::Url::parse(trimmed)
        && let Some(segments) = parsed.path_segments()
        && let Some(code) = segments.filter(|s| !s.is_empty()).next_back()
    {
        return code.to_string();
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_code_from_full_url() {
        assert_eq!(extract_code("https://sho.rt/abc123"), "abc123");
    }

    #[test]
    fn test_extracts_code_with_trailing_slash() {
        assert_eq!(extract_code("https://sho.rt/abc123/"), "abc123");
    }

    #[test]
    fn test_bare_code_passes_through() {
        assert_eq!(extract_code("abc123"), "abc123");
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(extract_code("  abc123 "), "abc123");
    }

    #[test]
    fn test_url_without_path_yields_input() {
        // Degenerate input; the resolver will report it as not found.
        assert_eq!(extract_code("https://sho.rt"), "https://sho.rt");
    }
}
