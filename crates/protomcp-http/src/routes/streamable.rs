//! Streamable HTTP: the single `/mcp` endpoint (spec.md §4.7, §6).
//!
//! `POST /mcp` is answered directly when the session has no SSE stream
//! attached, or with `202 Accepted` (the reply pushed onto the stream
//! instead) once a concurrent `GET /mcp` has opened one. `GET /mcp` opens
//! that stream. Both arms round-trip `Mcp-Session-Id`.

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use uuid::Uuid;

use crate::body::{self, RequestHead};
use crate::routes::{self, session_id_header_value};
use crate::transport::HttpState;

pub async fn post_mcp(State(state): State<HttpState>, headers: HeaderMap, body: Body) -> Response {
    let session_id = routes::session_id_header(&headers).unwrap_or_else(Uuid::new_v4);
    routes::ensure_session(&state, session_id);

    let head = RequestHead {
        method: "POST".to_string(),
        path: "/mcp".to_string(),
    };
    let bytes = match body::accumulate(body, head, state.config.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(reason) => return routes::bad_request(&reason),
    };

    let reply = state.handler.handle_frame(session_id, &bytes).await;
    let session_header = session_id_header_value(session_id);

    if state.channels.has_channel(session_id) {
        if let Some(reply) = reply {
            state.channels.push(session_id, Bytes::from(reply));
        }
        return Response::builder()
            .status(StatusCode::ACCEPTED)
            .header("mcp-session-id", session_header)
            .body(Body::empty())
            .expect("static headers and an empty body always build");
    }

    match reply {
        Some(bytes) => Response::builder()
            .status(StatusCode::OK)
            .header(axum::http::header::CONTENT_TYPE, "application/json")
            .header("mcp-session-id", session_header)
            .body(Body::from(bytes))
            .expect("a json body and static headers always build"),
        None => Response::builder()
            .status(StatusCode::ACCEPTED)
            .header("mcp-session-id", session_header)
            .body(Body::empty())
            .expect("static headers and an empty body always build"),
    }
}

pub async fn get_mcp(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let session_id = routes::session_id_header(&headers).unwrap_or_else(Uuid::new_v4);
    routes::ensure_session(&state, session_id);

    let (rx, generation) = state.channels.attach(session_id);
    let session_header = session_id_header_value(session_id);
    let body = routes::sse_body(state, session_id, generation, rx, None);
    routes::sse_response(vec![("mcp-session-id", session_header)], body)
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
    async fn post_without_attached_stream_answers_directly() {
        let state = state();
        let response = post_mcp(State(state), HeaderMap::new(), Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("mcp-session-id"));
    }

    #[tokio::test]
    async fn post_with_attached_stream_answers_202() {
        let state = state();
        let session_id = Uuid::new_v4();
        routes::ensure_session(&state, session_id);
        let (_rx, _generation) = state.channels.attach(session_id);

        let mut headers = HeaderMap::new();
        headers.insert("mcp-session-id", session_id.to_string().parse().unwrap());
        let response = post_mcp(State(state), headers, Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
