//! Transparent OAuth proxy header rewriting (spec.md §4.8 "Transparent
//! proxy mode"). The HTTP transport owns the actual request forwarding;
//! this module only knows which headers to drop and how to rewrite a
//! `Location` header, so it stays independent of whichever HTTP stack
//! issues the upstream call.

const STRIPPED_REQUEST_HEADERS: &[&str] = &["host", "content-length", "connection"];

const STRIPPED_RESPONSE_HEADERS: &[&str] =
    &["content-length", "connection", "content-encoding", "transfer-encoding"];

/// `true` if `name` (case-insensitive) should never be forwarded upstream.
pub fn is_stripped_request_header(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    STRIPPED_REQUEST_HEADERS.contains(&lower.as_str())
        || lower.starts_with("x-forwarded-")
        || lower.starts_with("access-control-")
}

/// `true` if `name` (case-insensitive) should never be relayed back to the
/// client from the upstream response. `content-encoding` is dropped because
/// the HTTP client already transparently decoded the body before we see it
/// (spec.md §4.8).
pub fn is_stripped_response_header(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    STRIPPED_RESPONSE_HEADERS.contains(&lower.as_str()) || lower.starts_with("x-forwarded-") || lower.starts_with("access-control-")
}

/// Rewrite an upstream-relative `Location` header into an absolute URL
/// against `upstream_base`. Redirects are never auto-followed by the proxy
/// (spec.md §4.8: "so that authorization codes round-trip through the
/// client") — this only fixes up the header value the client receives.
pub fn rewrite_location(location: &str, upstream_base: &str) -> String {
    if location.starts_with("http://") || location.starts_with("https://") {
        return location.to_string();
    }
    let base = upstream_base.trim_end_matches('/');
    if let Some(path) = location.strip_prefix('/') {
        format!("{base}/{path}")
    } else {
        format!("{base}/{location}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_hop_by_hop_and_forwarded_headers() {
        assert!(is_stripped_request_header("Host"));
        assert!(is_stripped_request_header("X-Forwarded-For"));
        assert!(is_stripped_request_header("Access-Control-Allow-Origin"));
        assert!(!is_stripped_request_header("Authorization"));
    }

    #[test]
    fn strips_content_encoding_from_responses() {
        assert!(is_stripped_response_header("Content-Encoding"));
        assert!(!is_stripped_response_header("Set-Cookie"));
    }

    #[test]
    fn rewrites_relative_location_to_absolute() {
        assert_eq!(
            rewrite_location("/oauth/callback?code=abc", "https://idp.example.com"),
            "https://idp.example.com/oauth/callback?code=abc"
        );
    }

    #[test]
    fn leaves_absolute_location_untouched() {
        assert_eq!(
            rewrite_location("https://other.example.com/callback", "https://idp.example.com"),
            "https://other.example.com/callback"
        );
    }
}
