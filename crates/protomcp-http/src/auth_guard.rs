//! Bearer-token gate in front of the MCP routes (spec.md §2: "OAuth
//! validation gates HTTP entry points before dispatch"; §7: "Authorization:
//! Unauthorized(reason). HTTP returns 401 with a JSON body").

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use protomcp_auth::Authorization;
use serde_json::json;

use crate::transport::HttpState;

/// Validate the `Authorization: Bearer <token>` header against the
/// configured OAuth validator before letting a request reach the
/// dispatcher. Requests pass through unchecked when no OAuth config is
/// present.
pub async fn require_bearer_token(
    State(state): State<HttpState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(oauth) = state.config.oauth.clone() else {
        return next.run(request).await;
    };

    let token = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = token else {
        return unauthorized_response("missing bearer token");
    };

    match oauth.validate_token(token).await {
        Authorization::Authorized(_) => next.run(request).await,
        Authorization::Unauthorized(reason) => unauthorized_response(&reason),
    }
}

fn unauthorized_response(reason: &str) -> Response {
    let body = json!({
        "jsonrpc": "2.0",
        "error": { "code": 401, "message": format!("Unauthorized: {reason}") },
    });
    (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
}
