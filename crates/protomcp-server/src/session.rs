//! Session store and the per-connection `Session` object (spec.md §4.3,
//! component C3).
//!
//! Sessions are kept in a `dashmap::DashMap` rather than a single actor task
//! — every session's own state (its oneshot correlation table, its minimum
//! log level) is already behind its own lock, so the store itself only needs
//! safe concurrent insert/remove/lookup, which `DashMap` gives for free
//! without a dedicated task and channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use protomcp_core::{ContextError, Error, SessionHandle};
use protomcp_transport_traits::{Transport, TransportId, TransportMessage};
use protomcp_types::{
    ClientCapabilities, ClientInfo, Id, LogLevel, Message, Notification, Request,
};
use serde_json::Value;
use tokio::sync::oneshot;
use uuid::Uuid;

/// A cached upstream access token, bound to whichever session presented the
/// `Mcp-Session-Id` that requested it (spec.md §4.8 "Token → session
/// binding").
#[derive(Debug, Clone)]
pub struct CachedToken {
    pub access_token: String,
    pub expiry: SystemTime,
    pub id_token: Option<String>,
    pub user_info: Option<Value>,
}

impl CachedToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expiry
    }
}

/// One connected peer's state: its outbound id allocator, its table of
/// suspended server→client requests awaiting a reply, the capabilities it
/// declared at `initialize` time, and (for HTTP-proxied OAuth) its cached
/// upstream token.
pub struct Session {
    id: Uuid,
    transport_id: TransportId,
    transport: Arc<dyn Transport>,
    next_id: AtomicI64,
    pending: Mutex<HashMap<Id, oneshot::Sender<Result<Value, Error>>>>,
    client_info: Mutex<Option<ClientInfo>>,
    client_capabilities: Mutex<Option<ClientCapabilities>>,
    minimum_log_level: Mutex<LogLevel>,
    initialized: Mutex<bool>,
    token: Mutex<Option<CachedToken>>,
}

impl Session {
    pub fn new(transport_id: TransportId, transport: Arc<dyn Transport>) -> Self {
        Self::with_id(Uuid::new_v4(), transport_id, transport)
    }

    /// Build a session with a caller-chosen id — used when the transport
    /// (not the session) is the natural source of the session identifier,
    /// e.g. a `Mcp-Session-Id` header round-tripped by an HTTP client.
    pub fn with_id(id: Uuid, transport_id: TransportId, transport: Arc<dyn Transport>) -> Self {
        Self {
            id,
            transport_id,
            transport,
            next_id: AtomicI64::new(1),
            pending: Mutex::new(HashMap::new()),
            client_info: Mutex::new(None),
            client_capabilities: Mutex::new(None),
            minimum_log_level: Mutex::new(LogLevel::Info),
            initialized: Mutex::new(false),
            token: Mutex::new(None),
        }
    }

    pub fn transport_id(&self) -> TransportId {
        self.transport_id
    }

    pub fn is_initialized(&self) -> bool {
        *self.initialized.lock()
    }

    pub fn mark_initialized(&self, client_info: ClientInfo, capabilities: ClientCapabilities) {
        *self.client_info.lock() = Some(client_info);
        *self.client_capabilities.lock() = Some(capabilities);
        *self.initialized.lock() = true;
    }

    pub fn client_info(&self) -> Option<ClientInfo> {
        self.client_info.lock().clone()
    }

    pub fn set_minimum_log_level(&self, level: LogLevel) {
        *self.minimum_log_level.lock() = level;
    }

    pub fn minimum_log_level(&self) -> LogLevel {
        *self.minimum_log_level.lock()
    }

    /// Cache an upstream access token against this session (spec.md §4.8).
    /// `expires_in` is the OAuth `expires_in` field, seconds from now.
    pub fn set_token(&self, access_token: String, expires_in: Duration, id_token: Option<String>, user_info: Option<Value>) {
        *self.token.lock() = Some(CachedToken {
            access_token,
            expiry: SystemTime::now() + expires_in,
            id_token,
            user_info,
        });
    }

    /// `true` if this session's cached token is `token` and has not expired
    /// (`accessTokenExpiry` checked strictly before any use, per spec.md §3).
    pub fn has_valid_token(&self, token: &str) -> bool {
        match &*self.token.lock() {
            Some(cached) => cached.access_token == token && !cached.is_expired(),
            None => false,
        }
    }

    pub fn cached_token(&self) -> Option<CachedToken> {
        self.token.lock().clone()
    }

    /// Send a log notification if `level` is at or above this session's
    /// current `minimumLogLevel` (spec.md §8: "monotonic-until-set").
    pub fn send_log_notification(&self, level: LogLevel, logger: Option<&str>, data: Value) {
        // `LogLevel` is ordered most-severe (Emergency) to least-severe
        // (Debug), so "at least as severe as the threshold" is `level <=
        // minimum_log_level`, not `>=`.
        if level > self.minimum_log_level() {
            return;
        }
        let mut params = serde_json::Map::new();
        params.insert("level".to_string(), serde_json::to_value(level).unwrap_or_default());
        if let Some(logger) = logger {
            params.insert("logger".to_string(), Value::String(logger.to_string()));
        }
        params.insert("data".to_string(), data);
        self.notify("notifications/message", Some(Value::Object(params)));
    }

    /// Resolve a suspended server→client request by its correlation id
    /// (spec.md §4.3: "a table of outstanding server-initiated requests
    /// keyed by message id").
    pub fn resolve_pending(&self, id: &Id, result: Result<Value, Error>) -> bool {
        let sender = self.pending.lock().remove(id);
        match sender {
            Some(sender) => {
                let _ = sender.send(result);
                true
            }
            None => false,
        }
    }

    /// Cancel every outstanding server→client request, e.g. on disconnect.
    pub fn cancel_pending(&self) {
        let mut pending = self.pending.lock();
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(Error::Internal("session closed".into())));
        }
    }

    fn send_message(&self, message: &Message) {
        let bytes = protomcp_core::codec::encode(message);
        let transport = self.transport.clone();
        let envelope = TransportMessage::new(self.id, bytes.into());
        tokio::spawn(async move {
            if let Err(err) = transport.send(envelope).await {
                tracing::warn!(error = %err, "failed to deliver message to session");
            }
        });
    }
}

#[async_trait]
impl SessionHandle for Session {
    fn session_id(&self) -> Uuid {
        self.id
    }

    fn minimum_log_level(&self) -> LogLevel {
        *self.minimum_log_level.lock()
    }

    fn client_capabilities(&self) -> Option<ClientCapabilities> {
        self.client_capabilities.lock().clone()
    }

    fn notify(&self, method: &str, params: Option<Value>) {
        let notification = Notification {
            method: method.to_string(),
            params: params.and_then(|v| v.as_object().cloned()),
        };
        self.send_message(&Message::Notification(notification));
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, Error> {
        let id = Id::from(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id.clone(), tx);

        let request = Request {
            id: id.clone(),
            method: method.to_string(),
            params: params.and_then(|v| v.as_object().cloned()),
        };
        self.send_message(&Message::Request(request));

        match rx.await {
            Ok(result) => result,
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(Error::Internal(ContextError::NoActiveSession.to_string()))
            }
        }
    }
}

/// A concurrent table of live sessions, keyed by session id (spec.md §4.3,
/// component C3). Each session serializes its own mutators, so the store
/// itself only needs safe concurrent insert/remove/lookup.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<Uuid, Arc<Session>>,
    default_transport: Mutex<Option<(TransportId, Arc<dyn Transport>)>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The transport a lazily-created session should inherit when no
    /// explicit transport is given to [`SessionStore::get_or_create`].
    pub fn set_default_transport(&self, transport_id: TransportId, transport: Arc<dyn Transport>) {
        *self.default_transport.lock() = Some((transport_id, transport));
    }

    pub fn insert(&self, session: Arc<Session>) -> Uuid {
        let id = session.session_id();
        self.sessions.insert(id, session);
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| entry.clone())
    }

    /// `session(id)` from spec.md §4.3: get the session if it exists,
    /// otherwise create one bound to the store's default transport. Returns
    /// `None` only if no default transport has been registered yet.
    pub fn get_or_create(&self, id: Uuid) -> Option<Arc<Session>> {
        if let Some(session) = self.get(&id) {
            return Some(session);
        }
        let (transport_id, transport) = self.default_transport.lock().clone()?;
        let session = Arc::new(Session::with_id(id, transport_id, transport));
        self.sessions.insert(id, session.clone());
        Some(session)
    }

    pub fn remove(&self, id: &Uuid) -> Option<Arc<Session>> {
        self.sessions.remove(id).map(|(_, session)| {
            session.cancel_pending();
            session
        })
    }

    /// `removeAll()` from spec.md §4.3: tear down every session, cancelling
    /// each one's outstanding server→client continuations.
    pub fn remove_all(&self) {
        let ids: Vec<Uuid> = self.sessions.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            self.remove(&id);
        }
    }

    /// `session(forToken)` from spec.md §4.3: a linear scan for the session
    /// whose cached token matches `token` and has not expired.
    pub fn session_for_token(&self, token: &str) -> Option<Arc<Session>> {
        self.sessions
            .iter()
            .find(|entry| entry.value().has_valid_token(token))
            .map(|entry| entry.value().clone())
    }

    /// `broadcastLog(LogMessage)` from spec.md §4.3: send a log
    /// notification to every session whose `minimumLogLevel` admits it.
    pub fn broadcast_log(&self, level: LogLevel, logger: Option<&str>, data: Value) {
        for entry in self.sessions.iter() {
            entry.value().send_log_notification(level, logger, data.clone());
        }
    }

    /// `forEach(block)` from spec.md §4.3: run `f` once per session with
    /// that session bound as the task-local current session, collecting
    /// results in arbitrary (here: iteration) order.
    pub async fn for_each<F, Fut, R>(&self, f: F) -> Vec<R>
    where
        F: Fn(Arc<Session>) -> Fut,
        Fut: std::future::Future<Output = R>,
    {
        let sessions: Vec<Arc<Session>> = self.sessions.iter().map(|entry| entry.value().clone()).collect();
        let mut results = Vec::with_capacity(sessions.len());
        for session in sessions {
            let handle: Arc<dyn protomcp_core::SessionHandle> = session.clone();
            let result = protomcp_core::bind_session(handle, f(session)).await;
            results.push(result);
        }
        results
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use protomcp_transport_traits::{
        TransportCapabilities, TransportResult, TransportState, TransportType,
    };

    #[derive(Debug)]
    struct NullTransport;

    #[async_trait]
    impl Transport for NullTransport {
        fn transport_type(&self) -> TransportType {
            TransportType::Stdio
        }
        fn capabilities(&self) -> TransportCapabilities {
            TransportCapabilities::default()
        }
        async fn state(&self) -> TransportState {
            TransportState::Connected
        }
        async fn start(&self) -> TransportResult<()> {
            Ok(())
        }
        async fn stop(&self) -> TransportResult<()> {
            Ok(())
        }
        async fn send(&self, _message: TransportMessage) -> TransportResult<()> {
            Ok(())
        }
        fn metrics(&self) -> protomcp_transport_traits::TransportMetrics {
            Default::default()
        }
    }

    #[tokio::test]
    async fn store_insert_get_remove_roundtrip() {
        let store = SessionStore::new();
        let session = Arc::new(Session::new(TransportId::new(), Arc::new(NullTransport)));
        let id = store.insert(session.clone());
        assert!(store.get(&id).is_some());
        assert_eq!(store.len(), 1);
        store.remove(&id);
        assert!(store.get(&id).is_none());
    }

    #[tokio::test]
    async fn request_resolves_through_pending_table() {
        let session = Arc::new(Session::new(TransportId::new(), Arc::new(NullTransport)));
        let session_for_task = session.clone();
        let task = tokio::spawn(async move { session_for_task.request("ping", None).await });

        // Give the spawned send a moment, then resolve id 1 directly.
        tokio::task::yield_now().await;
        let resolved = session.resolve_pending(&Id::from(1i64), Ok(Value::String("pong".into())));
        assert!(resolved);

        let result = task.await.unwrap().unwrap();
        assert_eq!(result, Value::String("pong".into()));
    }

    #[tokio::test]
    async fn cancel_pending_fails_outstanding_requests() {
        let session = Arc::new(Session::new(TransportId::new(), Arc::new(NullTransport)));
        let session_for_task = session.clone();
        let task = tokio::spawn(async move { session_for_task.request("ping", None).await });
        tokio::task::yield_now().await;
        session.cancel_pending();
        let result = task.await.unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn session_for_token_finds_only_the_valid_match() {
        let store = SessionStore::new();
        let stale = Arc::new(Session::new(TransportId::new(), Arc::new(NullTransport)));
        stale.set_token("shared-token".into(), Duration::from_secs(0), None, None);
        store.insert(stale);

        let fresh = Arc::new(Session::new(TransportId::new(), Arc::new(NullTransport)));
        fresh.set_token("shared-token".into(), Duration::from_secs(300), None, None);
        let fresh_id = store.insert(fresh);

        let found = store.session_for_token("shared-token").expect("a valid token match");
        assert_eq!(found.session_id(), fresh_id);
    }

    #[tokio::test]
    async fn get_or_create_uses_the_store_default_transport() {
        let store = SessionStore::new();
        store.set_default_transport(TransportId::new(), Arc::new(NullTransport));
        let id = Uuid::new_v4();
        let session = store.get_or_create(id).expect("default transport is registered");
        assert_eq!(session.session_id(), id);
        assert!(store.get(&id).is_some());
    }

    #[tokio::test]
    async fn for_each_binds_every_session_as_current() {
        let store = SessionStore::new();
        let a = Arc::new(Session::new(TransportId::new(), Arc::new(NullTransport)));
        let b = Arc::new(Session::new(TransportId::new(), Arc::new(NullTransport)));
        store.insert(a.clone());
        store.insert(b.clone());

        let seen = store
            .for_each(|session| async move {
                let current = protomcp_core::current_session().expect("session bound");
                (session.session_id(), current.session_id())
            })
            .await;

        assert_eq!(seen.len(), 2);
        for (session_id, bound_id) in seen {
            assert_eq!(session_id, bound_id);
        }
    }
}
