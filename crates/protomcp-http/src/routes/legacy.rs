//! Legacy HTTP+SSE (spec.md §4.7, §6): `GET /sse` opens a stream and
//! announces the per-session POST URL via an `endpoint` event; the client
//! then POSTs JSON-RPC frames to `/messages/{session-id}` and reads replies
//! off the SSE stream it already holds open.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::body::{self, RequestHead};
use crate::routes::{self, session_id_header_value};
use crate::sse;
use crate::transport::HttpState;

pub async fn get_sse(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let session_id = Uuid::new_v4();
    routes::ensure_session(&state, session_id);

    let (rx, generation) = state.channels.attach(session_id);
    let base_url = routes::request_base_url(&headers, &state.config.bind_addr());
    let endpoint = format!("{base_url}/messages/{session_id}");
    let initial_frame = sse::format_event(Some("endpoint"), &endpoint);

    let session_header = session_id_header_value(session_id);
    let body = routes::sse_body(state, session_id, generation, rx, Some(initial_frame));
    routes::sse_response(vec![("mcp-session-id", session_header)], body)
}

pub async fn post_messages(
    State(state): State<HttpState>,
    Path(session_id): Path<Uuid>,
    _headers: HeaderMap,
    body: axum::body::Body,
) -> Response {
    if state.sessions.get(&session_id).is_none() {
        return routes::not_found("no session for this messages URL");
    }

    let head = RequestHead {
        method: "POST".to_string(),
        path: format!("/messages/{session_id}"),
    };
    let bytes = match body::accumulate(body, head, state.config.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(reason) => return routes::bad_request(&reason),
    };

    let reply = state.handler.handle_frame(session_id, &bytes).await;
    if let Some(reply) = reply {
        state.channels.push(session_id, bytes::Bytes::from(reply));
    }

    StatusCode::ACCEPTED.into_response()
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

    struct EchoHandler;

    #[async_trait]
    impl FrameHandler for EchoHandler {
        async fn handle_frame(&self, _session_id: Uuid, bytes: &[u8]) -> Option<Vec<u8>> {
            Some(bytes.to_vec())
        }
        fn session_opened(&self, _session_id: Uuid, _transport_id: TransportId, _transport: Arc<dyn Transport>) {}
        fn session_closed(&self, _session_id: Uuid) {}
    }

    fn state() -> HttpState {
        let sessions = Arc::new(SessionStore::new());
        let config = HttpConfig::new("127.0.0.1", 0, "test");
        let transport = HttpTransport::new(Arc::new(EchoHandler), sessions, config);
        transport.http_state()
    }

    #[tokio::test]
    async fn post_to_unknown_session_is_404() {
        let state = state();
        let response = post_messages(State(state), Path(Uuid::new_v4()), HeaderMap::new(), axum::body::Body::empty()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn post_to_known_session_is_202() {
        let state = state();
        let session_id = Uuid::new_v4();
        routes::ensure_session(&state, session_id);

        let response = post_messages(
            State(state),
            Path(session_id),
            HeaderMap::new(),
            axum::body::Body::from(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
