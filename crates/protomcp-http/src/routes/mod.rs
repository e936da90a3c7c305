//! Route handlers, one module per route group from spec.md §6.

pub mod legacy;
pub mod oauth;
pub mod openapi;
pub mod streamable;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use crate::sse;
use crate::transport::HttpState;
use protomcp_types::IdSequence;

/// Register a brand-new session with the dispatcher and the store's default
/// transport if `session_id` isn't already known. Both SSE entry points
/// (legacy `/sse` and streamable `GET /mcp`) and the streamable `POST /mcp`
/// path share this so a session lazily created by one arm is visible to the
/// other.
pub(crate) fn ensure_session(state: &HttpState, session_id: Uuid) {
    if state.sessions.get(&session_id).is_none() {
        state.handler.session_opened(session_id, state.transport_id, state.transport());
    }
}

pub(crate) fn session_id_header_value(session_id: Uuid) -> HeaderValue {
    HeaderValue::from_str(&session_id.to_string()).expect("a uuid is always a valid header value")
}

/// Build the `text/event-stream` body for one session's channel: an
/// optional first frame (the legacy `endpoint` event), then every payload
/// the transport pushes onto this session's channel, reformatted as an SSE
/// `data:` frame, interleaved with whatever keep-alive traffic `mode` calls
/// for. The stream ends when a newer channel supersedes this one's
/// generation (spec.md §3: "never more than one active streaming channel of
/// each kind simultaneously").
pub(crate) fn sse_body(
    state: HttpState,
    session_id: Uuid,
    generation: u64,
    mut rx: UnboundedReceiver<Bytes>,
    initial_frame: Option<String>,
) -> Body {
    use crate::config::KeepAliveMode;

    let stream = async_stream::stream! {
        if let Some(frame) = initial_frame {
            yield Ok::<_, std::convert::Infallible>(Bytes::from(frame));
        }

        let keep_alive = state.config.keep_alive.clone();
        let ping_ids = IdSequence::new();
        let mut ticker = tokio::time::interval(keep_alive.period);
        ticker.tick().await; // first tick fires immediately; skip it

        loop {
            if !state.channels.is_current(session_id, generation) {
                break;
            }
            tokio::select! {
                frame = rx.recv() => {
                    match frame {
                        Some(payload) => {
                            let text = String::from_utf8_lossy(&payload).into_owned();
                            yield Ok(Bytes::from(sse::format_event(None, &text)));
                        }
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    match keep_alive.mode {
                        KeepAliveMode::Off => {}
                        KeepAliveMode::SseComment => {
                            yield Ok(Bytes::from_static(sse::COMMENT_KEEPALIVE.as_bytes()));
                        }
                        KeepAliveMode::Ping => {
                            let ping = protomcp_types::Message::Request(protomcp_types::Request {
                                id: ping_ids.next(),
                                method: "ping".to_string(),
                                params: None,
                            });
                            let encoded = protomcp_core::encode(&ping);
                            let text = String::from_utf8_lossy(&encoded).into_owned();
                            yield Ok(Bytes::from(sse::format_event(None, &text)));
                        }
                    }
                }
            }
        }

        state.channels.detach(session_id, generation);
    };

    Body::from_stream(stream)
}

pub(crate) fn sse_response(headers: Vec<(&'static str, HeaderValue)>, body: Body) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(axum::http::header::CONTENT_TYPE, "text/event-stream")
        .header(axum::http::header::CACHE_CONTROL, "no-cache");
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    builder.body(body).expect("static headers and a streaming body always build")
}

/// `Mcp-Session-Id` from the inbound request, if the client already has one
/// (spec.md §4.7: "round-tripped via the `Mcp-Session-Id` header on every
/// request and response"). Callers that get `None` mint a fresh id.
pub fn session_id_header(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get("mcp-session-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
}

/// Build an absolute base URL (`scheme://host`) from the inbound request's
/// `Host` header, falling back to `fallback` (the transport's own configured
/// bind address) when the client sent none.
pub fn request_base_url(headers: &HeaderMap, fallback: &str) -> String {
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(fallback);
    format!("http://{host}")
}

pub(crate) fn bad_request(reason: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(json!({
            "jsonrpc": "2.0",
            "error": { "code": -32600, "message": reason },
        })),
    )
        .into_response()
}

pub(crate) fn not_found(reason: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        axum::Json(json!({
            "jsonrpc": "2.0",
            "error": { "code": -32601, "message": reason },
        })),
    )
        .into_response()
}
