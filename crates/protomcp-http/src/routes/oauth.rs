//! OAuth metadata endpoints and the transparent proxy (spec.md §4.8, §6).
//!
//! `authorization_server_metadata` and `protected_resource_metadata` are
//! synthesized locally (RFC 8414 / RFC 9728 documents, rewritten to the
//! proxy's own base URL when `transparent_proxy` is set). Everything else
//! here — discovery, JWKS, `/authorize`, `/userinfo`, `/oauth/*` — is a byte
//! forward to the configured upstream issuer, with `protomcp_auth::proxy`
//! deciding which headers survive the round trip.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use protomcp_auth::{proxy, ProtectedResourceMetadataDoc};
use url::Url;

use crate::routes;
use crate::transport::HttpState;

pub async fn authorization_server_metadata(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let Some(oauth) = state.config.oauth.as_ref() else {
        return routes::not_found("no OAuth configuration");
    };
    let base_url = routes::request_base_url(&headers, &state.config.bind_addr());
    let proxy_base = Url::parse(&base_url).ok();
    axum::Json(oauth.metadata_document(proxy_base.as_ref())).into_response()
}

pub async fn protected_resource_metadata(State(state): State<HttpState>) -> Response {
    match state.config.protected_resource.as_ref() {
        Some(metadata) => axum::Json(ProtectedResourceMetadataDoc::from(metadata)).into_response(),
        None => routes::not_found("no protected-resource metadata configured"),
    }
}

pub async fn proxy_openid_configuration(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let Some(oauth) = state.config.oauth.as_ref() else {
        return routes::not_found("no OAuth configuration");
    };
    let target = format!("{}/.well-known/openid-configuration", oauth.issuer.as_str().trim_end_matches('/'));
    forward(&state, &target, Method::GET, headers, Body::empty()).await
}

pub async fn proxy_jwks(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let Some(oauth) = state.config.oauth.as_ref() else {
        return routes::not_found("no OAuth configuration");
    };
    let Some(jwks_endpoint) = oauth.jwks_endpoint.as_ref() else {
        return routes::not_found("issuer has no jwks endpoint");
    };
    forward(&state, jwks_endpoint.as_str(), Method::GET, headers, Body::empty()).await
}

pub async fn proxy_authorize(State(state): State<HttpState>, method: Method, headers: HeaderMap, body: Body) -> Response {
    let Some(oauth) = state.config.oauth.as_ref() else {
        return routes::not_found("no OAuth configuration");
    };
    forward(&state, oauth.authorization_endpoint.as_str(), method, headers, body).await
}

pub async fn proxy_userinfo(State(state): State<HttpState>, method: Method, headers: HeaderMap, body: Body) -> Response {
    let Some(oauth) = state.config.oauth.as_ref() else {
        return routes::not_found("no OAuth configuration");
    };
    let Some(userinfo_endpoint) = oauth.userinfo_endpoint.as_ref() else {
        return routes::not_found("issuer has no userinfo endpoint");
    };
    forward(&state, userinfo_endpoint.as_str(), method, headers, body).await
}

/// `/oauth/{*rest}` (spec.md §4.8): `token` and `register` map to the
/// endpoints discovery resolved; anything else forwards to the same path
/// under the issuer's own base URL.
pub async fn proxy_oauth(
    State(state): State<HttpState>,
    Path(rest): Path<String>,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let Some(oauth) = state.config.oauth.as_ref() else {
        return routes::not_found("no OAuth configuration");
    };

    let target = match rest.as_str() {
        "token" => oauth.token_endpoint.as_str().to_string(),
        "register" => match oauth.registration_endpoint.as_ref() {
            Some(endpoint) => endpoint.to_string(),
            None => return routes::not_found("issuer has no registration endpoint"),
        },
        other => format!("{}/oauth/{other}", oauth.issuer.as_str().trim_end_matches('/')),
    };

    let bound_session = routes::session_id_header(&headers);
    let response = forward(&state, &target, method, headers, body).await;

    if target == oauth.token_endpoint.as_str() {
        bind_token_to_session(&state, bound_session, response).await
    } else {
        response
    }
}

/// Forward one request to `target_url`, stripping hop-by-hop/CORS headers in
/// both directions and rewriting a relative `Location` to an absolute URL
/// against the upstream origin. Redirects are never auto-followed (the
/// shared `http_client` is built with `redirect::Policy::none()`).
async fn forward(state: &HttpState, target_url: &str, method: Method, headers: HeaderMap, body: Body) -> Response {
    let Ok(target) = Url::parse(target_url) else {
        return routes::bad_request("misconfigured upstream endpoint");
    };

    let body_bytes = match axum::body::to_bytes(body, state.config.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(_) => return routes::bad_request("request body too large"),
    };

    let mut upstream_request = state.http_client.request(method, target.clone());
    for (name, value) in headers.iter() {
        if !proxy::is_stripped_request_header(name.as_str()) {
            upstream_request = upstream_request.header(name.clone(), value.clone());
        }
    }
    if !body_bytes.is_empty() {
        upstream_request = upstream_request.body(body_bytes);
    }

    let upstream_response = match upstream_request.send().await {
        Ok(response) => response,
        Err(err) => {
            return (StatusCode::BAD_GATEWAY, format!("upstream request failed: {err}")).into_response();
        }
    };

    let status = upstream_response.status();
    let upstream_base = target.origin().ascii_serialization();
    let mut response_headers = HeaderMap::new();
    for (name, value) in upstream_response.headers().iter() {
        if proxy::is_stripped_response_header(name.as_str()) {
            continue;
        }
        if name.as_str().eq_ignore_ascii_case("location") {
            if let Ok(location) = value.to_str() {
                let rewritten = proxy::rewrite_location(location, &upstream_base);
                if let Ok(value) = HeaderValue::from_str(&rewritten) {
                    response_headers.insert(HeaderName::from_bytes(b"location").unwrap(), value);
                    continue;
                }
            }
        }
        response_headers.insert(name.clone(), value.clone());
    }

    let body_bytes = upstream_response.bytes().await.unwrap_or_default();
    let mut builder = Response::builder().status(status);
    for (name, value) in response_headers.iter() {
        builder = builder.header(name.clone(), value.clone());
    }
    builder.body(Body::from(body_bytes)).unwrap_or_else(|_| StatusCode::BAD_GATEWAY.into_response())
}

/// Cache the upstream access token against the session that requested it, so
/// later requests bearing the same bearer token resolve back to this session
/// (spec.md §4.8 "Token → session binding").
async fn bind_token_to_session(state: &HttpState, session_id: Option<uuid::Uuid>, response: Response) -> Response {
    let Some(session_id) = session_id else {
        return response;
    };
    let Some(session) = state.sessions.get(&session_id) else {
        return response;
    };
    if !response.status().is_success() {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, state.config.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(_) => return Response::from_parts(parts, Body::empty()),
    };

    if let Ok(token_response) = serde_json::from_slice::<serde_json::Value>(&bytes) {
        if let Some(access_token) = token_response.get("access_token").and_then(|v| v.as_str()) {
            let expires_in = token_response
                .get("expires_in")
                .and_then(|v| v.as_u64())
                .map(std::time::Duration::from_secs)
                .unwrap_or(std::time::Duration::from_secs(3600));
            let id_token = token_response.get("id_token").and_then(|v| v.as_str()).map(str::to_string);
            session.set_token(access_token.to_string(), expires_in, id_token, None);
        }
    }

    Response::from_parts(parts, Body::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::transport::HttpTransport;
    use async_trait::async_trait;
    use protomcp_server::SessionStore;
    use protomcp_transport_traits::{FrameHandler, Transport, TransportId};
    use std::sync::Arc;
    use uuid::Uuid;

    struct NullHandler;

    #[async_trait]
    impl FrameHandler for NullHandler {
        async fn handle_frame(&self, _session_id: Uuid, _bytes: &[u8]) -> Option<Vec<u8>> {
            None
        }
        fn session_opened(&self, _session_id: Uuid, _transport_id: TransportId, _transport: Arc<dyn Transport>) {}
        fn session_closed(&self, _session_id: Uuid) {}
    }

    fn state_without_oauth() -> HttpState {
        let sessions = Arc::new(SessionStore::new());
        let config = HttpConfig::new("127.0.0.1", 0, "test");
        let transport = HttpTransport::new(Arc::new(NullHandler), sessions, config);
        transport.http_state()
    }

    #[tokio::test]
    async fn metadata_routes_404_without_oauth_config() {
        let state = state_without_oauth();
        let response = authorization_server_metadata(State(state.clone()), HeaderMap::new()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = protected_resource_metadata(State(state)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn rewrite_location_preserves_proxy_forwarding_contract() {
        // The forwarding helper delegates entirely to `protomcp_auth::proxy`;
        // this just pins that the module is wired up with the right shape.
        let rewritten = proxy::rewrite_location("/callback", "https://idp.example.com");
        assert_eq!(rewritten, "https://idp.example.com/callback");
    }
}
