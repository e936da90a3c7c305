//! The JSON-RPC method table and batch-processing loop (spec.md §4.9,
//! component C9). A [`Dispatcher`] owns nothing transport-specific; it is
//! handed raw bytes off whatever transport read them and a [`Session`] to
//! route replies and context through.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use protomcp_core::{bind_session, Error, RequestContext};
use protomcp_transport_traits::{FrameHandler, Transport, TransportId};
use protomcp_types::{Id, Message, ServerCapabilities, ServerInfo};
use serde_json::Value;
use uuid::Uuid;

use crate::error::to_error_message;
use crate::handlers;
use crate::registry::Registry;
use crate::session::{Session, SessionStore};

/// Routes decoded JSON-RPC messages to method handlers. `T` is the
/// provider's own type, used purely as the registry's lookup key (spec.md
/// §9) — the dispatcher never constructs or calls into `T` itself.
pub struct Dispatcher<T> {
    registry: Arc<Registry>,
    sessions: Arc<SessionStore>,
    server_info: ServerInfo,
    capabilities: ServerCapabilities,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> Dispatcher<T> {
    pub fn new(
        registry: Arc<Registry>,
        sessions: Arc<SessionStore>,
        server_info: ServerInfo,
        capabilities: ServerCapabilities,
    ) -> Self {
        Self {
            registry,
            sessions,
            server_info,
            capabilities,
            _marker: PhantomData,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Decode a raw frame (single message or batch array), dispatch every
    /// message it contains, and encode whatever replies resulted. Returns
    /// `None` if the frame contained only notifications (spec.md §4.1:
    /// "a batch of only notifications produces no reply frame at all").
    pub async fn handle_frame(&self, session: &Arc<Session>, bytes: &[u8]) -> Option<Vec<u8>> {
        let messages = match protomcp_core::decode_batch(bytes) {
            Ok(messages) => messages,
            Err(err) => {
                let reply = to_error_message(None, &err);
                return Some(protomcp_core::encode(&reply));
            }
        };

        let mut replies = Vec::new();
        for message in messages {
            if let Some(reply) = self.dispatch_one(session, message).await {
                replies.push(reply);
            }
        }

        if replies.is_empty() {
            None
        } else if replies.len() == 1 {
            Some(protomcp_core::encode(&replies[0]))
        } else {
            Some(protomcp_core::encode_batch(&replies))
        }
    }

    async fn dispatch_one(&self, session: &Arc<Session>, message: Message) -> Option<Message> {
        match message {
            Message::Request(request) => {
                let id = request.id.clone();
                let progress_token = request
                    .params
                    .as_ref()
                    .and_then(|p| p.get("_meta"))
                    .and_then(Value::as_object)
                    .and_then(|m| m.get("progressToken"))
                    .cloned();
                let ctx = RequestContext::new(Some(id.clone()), Some(request.method.clone()), progress_token);
                let session_handle: Arc<dyn protomcp_core::SessionHandle> = session.clone();

                let result = ctx
                    .scope(bind_session(session_handle, self.handle_method(
                        session,
                        &request.method,
                        request.params.unwrap_or_default(),
                    )))
                    .await;

                Some(match result {
                    Ok(result) => Message::response(id, result),
                    Err(err) => to_error_message(Some(id), &err),
                })
            }
            Message::Notification(notification) => {
                if notification.method == "notifications/initialized" {
                    // Handshake complete; nothing further to do server-side.
                } else {
                    tracing::debug!(method = %notification.method, "unhandled notification");
                }
                None
            }
            Message::Response(response) => {
                session.resolve_pending(&response.id, Ok(Value::Object(response.result)));
                None
            }
            Message::Error(error) => {
                if let Some(id) = error.id {
                    session.resolve_pending(&id, Err(Error::Internal(error.error.message)));
                }
                None
            }
        }
    }

    async fn handle_method(
        &self,
        session: &Arc<Session>,
        method: &str,
        params: serde_json::Map<String, Value>,
    ) -> Result<serde_json::Map<String, Value>, Error> {
        if method != "initialize" && method != "ping" && !session.is_initialized() {
            return Err(Error::InvalidRequest(
                "session is not initialized; call `initialize` first".to_string(),
            ));
        }

        match method {
            "initialize" => handlers::initialize::handle(session, params, &self.server_info, &self.capabilities),
            "ping" => handlers::ping::handle(),
            "tools/list" => handlers::tools::list::<T>(&self.registry).await,
            "tools/call" => handlers::tools::call::<T>(&self.registry, params).await,
            "resources/list" => handlers::resources::list::<T>(&self.registry).await,
            "resources/read" => handlers::resources::read::<T>(&self.registry, params).await,
            "prompts/list" => handlers::prompts::list::<T>(&self.registry).await,
            "prompts/get" => handlers::prompts::get::<T>(&self.registry, params).await,
            "completion/complete" => handlers::completion::complete::<T>(&self.registry, params).await,
            "logging/setLevel" => handlers::logging::set_level(session, params),
            other => Err(Error::MethodNotFound(other.to_string())),
        }
    }
}

#[async_trait]
impl<T: 'static + Send + Sync> FrameHandler for Dispatcher<T> {
    async fn handle_frame(&self, session_id: Uuid, bytes: &[u8]) -> Option<Vec<u8>> {
        let Some(session) = self.sessions.get(&session_id) else {
            tracing::warn!(%session_id, "frame for unknown session");
            return None;
        };
        self.handle_frame(&session, bytes).await
    }

    fn session_opened(&self, session_id: Uuid, transport_id: TransportId, transport: Arc<dyn Transport>) {
        let session = Arc::new(Session::with_id(session_id, transport_id, transport));
        self.sessions.insert(session);
    }

    fn session_closed(&self, session_id: Uuid) {
        self.sessions.remove(&session_id);
    }
}

/// Reconstruct an [`Id`] from raw JSON for callers outside this crate that
/// only have bytes (kept here so transports never need to depend on
/// `protomcp-types`'s `Id` decoding directly).
pub fn parse_reply_id(value: &Value) -> Option<Id> {
    serde_json::from_value(value.clone()).ok()
}
