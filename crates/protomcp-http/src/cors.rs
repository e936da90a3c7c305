//! CORS policy (spec.md §4.7, §6): every non-SSE response gets
//! `Access-Control-Allow-Origin: *`; OPTIONS preflight answers with the
//! union of methods/headers the MCP and OAuth routes accept.

use axum::http::{HeaderName, Method};
use tower_http::cors::{Any, CorsLayer};

/// Methods and headers listed in spec.md §6's OPTIONS row.
pub const ALLOWED_METHODS: &str = "GET,POST,OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type, Authorization, MCP-Protocol-Version";

fn allowed_methods() -> Vec<Method> {
    ALLOWED_METHODS
        .split(',')
        .map(|m| m.trim().parse().expect("ALLOWED_METHODS entries are valid methods"))
        .collect()
}

fn allowed_headers() -> Vec<HeaderName> {
    ALLOWED_HEADERS
        .split(',')
        .map(|h| h.trim().parse().expect("ALLOWED_HEADERS entries are valid header names"))
        .collect()
}

/// A permissive, wildcard-origin CORS layer matching spec.md §4.7 exactly:
/// no credentials, any origin, the fixed method/header set every route
/// (MCP and OAuth alike) may need.
pub fn layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(allowed_methods())
        .allow_headers(allowed_headers())
        .expose_headers([
            HeaderName::from_static("mcp-session-id"),
            HeaderName::from_static("content-type"),
        ])
}
