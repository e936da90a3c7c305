//! OpenAPI-style tool invocation and the optional manifest documents
//! (spec.md §4.7 "excluded collaborator", §6: `POST /<server>/<tool-name>`,
//! `/.well-known/ai-plugin.json`, `/openapi.json`).
//!
//! A bare HTTP POST here is translated into the same `tools/call` JSON-RPC
//! request the MCP routes would dispatch, so tool lookup, argument
//! enrichment, and error shaping all go through the one code path in
//! `protomcp-server` rather than a second, parallel implementation.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::routes;
use crate::transport::HttpState;

pub async fn call_tool(
    State(state): State<HttpState>,
    Path((server, tool_name)): Path<(String, String)>,
    headers: HeaderMap,
    body: axum::Json<Value>,
) -> Response {
    if server.to_lowercase() != state.config.server_name {
        return routes::not_found(&format!("no such server `{server}`"));
    }

    let session_id = routes::session_id_header(&headers).unwrap_or_else(Uuid::new_v4);
    routes::ensure_session(&state, session_id);

    let arguments = body.0;
    let request = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": { "name": tool_name, "arguments": arguments },
    });
    let bytes = serde_json::to_vec(&request).unwrap_or_default();

    match state.handler.handle_frame(session_id, &bytes).await {
        Some(reply_bytes) => match serde_json::from_slice::<Value>(&reply_bytes) {
            Ok(reply) => match reply.get("error") {
                Some(error) => (StatusCode::BAD_REQUEST, axum::Json(error.clone())).into_response(),
                None => (StatusCode::OK, axum::Json(reply.get("result").cloned().unwrap_or(Value::Null))).into_response(),
            },
            Err(_) => routes::bad_request("dispatcher produced a non-JSON reply"),
        },
        None => routes::bad_request("tool call produced no reply"),
    }
}

pub async fn ai_plugin_manifest(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let base_url = routes::request_base_url(&headers, &state.config.bind_addr());
    match state.config.manifest_provider.as_ref().and_then(|p| p.ai_plugin_manifest(&base_url)) {
        Some(manifest) => axum::Json(manifest).into_response(),
        None => routes::not_found("no ai-plugin manifest configured"),
    }
}

pub async fn openapi_spec(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let base_url = routes::request_base_url(&headers, &state.config.bind_addr());
    match state.config.manifest_provider.as_ref().and_then(|p| p.openapi_spec(&base_url)) {
        Some(spec) => axum::Json(spec).into_response(),
        None => routes::not_found("no openapi spec configured"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::manifest::ManifestProvider;
    use crate::transport::HttpTransport;
    use async_trait::async_trait;
    use protomcp_server::SessionStore;
    use protomcp_transport_traits::{FrameHandler, Transport, TransportId};
    use std::sync::Arc;

    struct EchoHandler;

    #[async_trait]
    impl FrameHandler for EchoHandler {
        async fn handle_frame(&self, _session_id: Uuid, bytes: &[u8]) -> Option<Vec<u8>> {
            let request: Value = serde_json::from_slice(bytes).ok()?;
            Some(
                json!({
                    "jsonrpc": "2.0",
                    "id": request.get("id").cloned().unwrap_or(Value::Null),
                    "result": { "content": [], "isError": false },
                })
                .to_string()
                .into_bytes(),
            )
        }
        fn session_opened(&self, _session_id: Uuid, _transport_id: TransportId, _transport: Arc<dyn Transport>) {}
        fn session_closed(&self, _session_id: Uuid) {}
    }

    struct NoManifest;
    impl ManifestProvider for NoManifest {
        fn ai_plugin_manifest(&self, _base_url: &str) -> Option<Value> {
            None
        }
        fn openapi_spec(&self, _base_url: &str) -> Option<Value> {
            None
        }
    }

    fn state() -> HttpState {
        let sessions = Arc::new(SessionStore::new());
        let config = HttpConfig::new("127.0.0.1", 0, "calculator").with_manifest_provider(Arc::new(NoManifest));
        let transport = HttpTransport::new(Arc::new(EchoHandler), sessions, config);
        transport.http_state()
    }

    #[tokio::test]
    async fn unknown_server_name_is_404() {
        let state = state();
        let response = call_tool(
            State(state),
            Path(("other".to_string(), "add".to_string())),
            HeaderMap::new(),
            axum::Json(json!({})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn matching_server_name_dispatches_tool_call() {
        let state = state();
        let response = call_tool(
            State(state),
            Path(("calculator".to_string(), "add".to_string())),
            HeaderMap::new(),
            axum::Json(json!({"a": 1, "b": 2})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_manifest_provider_is_404() {
        let state = state();
        let response = ai_plugin_manifest(State(state), HeaderMap::new()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
