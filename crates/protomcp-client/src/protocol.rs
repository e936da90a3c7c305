//! Request/response correlation and the background routing task that is
//! the single consumer of [`ClientTransport::receive`].
//!
//! Mirrors the teacher's `MessageDispatcher`: one task owns the read side
//! of the transport, routes `Response`/`Error` frames to whichever
//! `request()` call is waiting on that id, and routes server-initiated
//! `Request`/`Notification` frames to the handlers registered in
//! [`crate::handlers::HandlerRegistry`]. Centralizing the read loop here is
//! what lets `Client::call_tool` and a concurrent `sampling/createMessage`
//! reply interleave safely over one transport.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use protomcp_core::codec;
use protomcp_types::{error_code, ErrorResponse, Id, IdSequence, Message, Notification, Request, Response, RpcError};

use crate::error::{ClientError, Result};
use crate::handlers::HandlerRegistry;
use crate::transport::ClientTransport;

type PendingTable = Mutex<HashMap<Id, oneshot::Sender<Result<Value>>>>;

fn as_params(value: Option<Value>) -> Option<Map<String, Value>> {
    match value {
        Some(Value::Object(map)) => Some(map),
        Some(Value::Null) | None => None,
        Some(other) => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            Some(map)
        }
    }
}

/// Owns id allocation, the pending-request table, and the background
/// routing task for one connection.
pub(crate) struct Protocol<T: ClientTransport> {
    transport: Arc<T>,
    ids: IdSequence,
    pending: PendingTable,
    handlers: Mutex<HandlerRegistry>,
    shutdown: Arc<Notify>,
    routing_task: Mutex<Option<JoinHandle<()>>>,
}

impl<T: ClientTransport + 'static> Protocol<T> {
    pub(crate) fn new(transport: Arc<T>) -> Arc<Self> {
        let protocol = Arc::new(Self {
            transport,
            ids: IdSequence::new(),
            pending: Mutex::new(HashMap::new()),
            handlers: Mutex::new(HandlerRegistry::new()),
            shutdown: Arc::new(Notify::new()),
            routing_task: Mutex::new(None),
        });
        let task = Self::spawn_routing_task(protocol.clone());
        *protocol.routing_task.lock().unwrap() = Some(task);
        protocol
    }

    pub(crate) fn handlers(&self) -> &Mutex<HandlerRegistry> {
        &self.handlers
    }

    /// Send a request and await its matching response, resolving with the
    /// bare `result` value or a [`ClientError::Server`] built from the
    /// peer's error object.
    pub(crate) async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.ids.next();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id.clone(), tx);

        let message = Message::Request(Request {
            id: id.clone(),
            method: method.to_string(),
            params: as_params(params),
        });
        if let Err(err) = self.write(&message).await {
            self.pending.lock().unwrap().remove(&id);
            return Err(err);
        }

        rx.await.unwrap_or(Err(ClientError::ConnectionClosed))
    }

    pub(crate) async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        let message = Message::Notification(Notification {
            method: method.to_string(),
            params: as_params(params),
        });
        self.write(&message).await
    }

    async fn write(&self, message: &Message) -> Result<()> {
        let bytes = codec::encode(message);
        self.transport.send(&bytes).await.map_err(Into::into)
    }

    async fn reply_result(&self, id: Id, result: Value) {
        let result = match result {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        let message = Message::Response(Response { id, result });
        if let Err(err) = self.write(&message).await {
            warn!(%err, "failed to send reply to server-initiated request");
        }
    }

    async fn reply_error(&self, id: Id, code: i64, message_text: &str) {
        let message = Message::Error(ErrorResponse {
            id: Some(id),
            error: RpcError::new(code, message_text),
        });
        if let Err(err) = self.write(&message).await {
            warn!(%err, "failed to send error reply to server-initiated request");
        }
    }

    /// Resolve every still-pending request with [`ClientError::ConnectionClosed`].
    /// Called once the transport's read side ends, so a crash or a closed
    /// pipe fails in-flight calls instead of hanging them forever.
    fn fail_all_pending(&self) {
        let mut pending = self.pending.lock().unwrap();
        for (id, tx) in pending.drain() {
            trace!(?id, "failing pending request: connection closed");
            let _ = tx.send(Err(ClientError::ConnectionClosed));
        }
    }

    fn spawn_routing_task(protocol: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = protocol.shutdown.notified() => break,
                    received = protocol.transport.receive() => {
                        match received {
                            Ok(Some(bytes)) => protocol.route(&bytes).await,
                            Ok(None) => break,
                            Err(err) => {
                                warn!(%err, "client transport receive failed");
                                break;
                            }
                        }
                    }
                }
            }
            protocol.fail_all_pending();
        })
    }

    async fn route(&self, bytes: &[u8]) {
        let messages = match codec::decode_batch(bytes) {
            Ok(messages) => messages,
            Err(err) => {
                warn!(%err, "received frame that is not valid JSON-RPC");
                return;
            }
        };

        for message in messages {
            match message {
                Message::Response(response) => {
                    self.route_response(response.id, Ok(Value::Object(response.result)));
                }
                Message::Error(error) => {
                    if let Some(id) = error.id {
                        self.route_response(id, Err(error.error.into()));
                    } else {
                        warn!("received error response with no id");
                    }
                }
                Message::Request(request) => self.handle_server_request(request).await,
                Message::Notification(notification) => self.handle_server_notification(notification),
            }
        }
    }

    fn route_response(&self, id: Id, result: Result<Value>) {
        match self.pending.lock().unwrap().remove(&id) {
            Some(tx) => {
                let _ = tx.send(result);
            }
            None => warn!(?id, "received response for unknown or expired request id"),
        }
    }

    async fn handle_server_request(&self, request: Request) {
        debug!(method = %request.method, "routing server-initiated request");
        let params = request.params.map(Value::Object).unwrap_or(Value::Null);
        match request.method.as_str() {
            "ping" => self.reply_result(request.id, serde_json::json!({})).await,
            "sampling/createMessage" => self.dispatch_sampling(request.id, params).await,
            "elicitation/create" => self.dispatch_elicitation(request.id, params).await,
            other => {
                self.reply_error(
                    request.id,
                    error_code::METHOD_NOT_FOUND,
                    &format!("unsupported server-initiated method: {other}"),
                )
                .await;
            }
        }
    }

    async fn dispatch_sampling(&self, id: Id, params: Value) {
        let handler = self.handlers.lock().unwrap().sampling.clone();
        let Some(handler) = handler else {
            self.reply_error(id, error_code::METHOD_NOT_FOUND, "sampling not supported").await;
            return;
        };
        match handler.handle_create_message(params).await {
            Ok(value) => self.reply_result(id, value).await,
            Err(err) => self.reply_error(id, error_code::INTERNAL_ERROR, &err.to_string()).await,
        }
    }

    async fn dispatch_elicitation(&self, id: Id, params: Value) {
        let handler = self.handlers.lock().unwrap().elicitation.clone();
        let Some(handler) = handler else {
            self.reply_error(id, error_code::METHOD_NOT_FOUND, "elicitation not supported").await;
            return;
        };
        match handler.handle_elicit(params).await {
            Ok(value) => self.reply_result(id, value).await,
            Err(err) => self.reply_error(id, error_code::INTERNAL_ERROR, &err.to_string()).await,
        }
    }

    fn handle_server_notification(&self, notification: Notification) {
        let params = notification.params.map(Value::Object).unwrap_or(Value::Null);
        match notification.method.as_str() {
            "notifications/progress" => {
                if let Some(callback) = self.handlers.lock().unwrap().on_progress.clone() {
                    callback(params);
                }
            }
            "notifications/message" => {
                if let Some(callback) = self.handlers.lock().unwrap().on_log.clone() {
                    callback(params);
                }
            }
            other => debug!(method = %other, "ignoring unsolicited notification"),
        }
    }
}

impl<T: ClientTransport> Drop for Protocol<T> {
    fn drop(&mut self) {
        self.shutdown.notify_one();
    }
}
