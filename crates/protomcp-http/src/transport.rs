//! [`HttpTransport`]: binds an axum server exposing every route in spec.md
//! §6 and implements [`Transport`] so the dispatcher can push frames back
//! onto whichever session's SSE channel is attached.
//!
//! Follows the same split as the teacher's other transports: interior
//! mutability only where it must cross an `.await` or be touched from many
//! tasks, a `Weak` self-reference so route handlers can hand out
//! `Arc<dyn Transport>` without the struct owning itself.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use axum::routing::{get, post};
use axum::Router;
use protomcp_server::SessionStore;
use protomcp_transport_traits::{
    AtomicMetrics, FrameHandler, Transport, TransportCapabilities, TransportError, TransportId,
    TransportMessage, TransportMetrics, TransportResult, TransportState, TransportType,
};
use tokio::sync::Mutex as TokioMutex;
use tokio::task::JoinHandle;

use crate::config::HttpConfig;
use crate::sse::ChannelTable;
use crate::{auth_guard, cors, routes};

/// Shared state every route handler and middleware receives through axum's
/// `State` extractor. Cheap to clone: every field is an `Arc` or plain
/// config data.
#[derive(Clone)]
pub struct HttpState {
    pub handler: Arc<dyn FrameHandler>,
    pub sessions: Arc<SessionStore>,
    pub channels: Arc<ChannelTable>,
    pub config: HttpConfig,
    pub transport_id: TransportId,
    pub http_client: reqwest::Client,
    pub self_transport: std::sync::Weak<HttpTransport>,
}

impl HttpState {
    pub(crate) fn transport(&self) -> Arc<dyn Transport> {
        self.self_transport
            .upgrade()
            .expect("http transport dropped while state is still in use")
    }
}

/// The HTTP+SSE transport (spec.md §4.7, component C7).
pub struct HttpTransport {
    self_ref: Weak<HttpTransport>,
    config: HttpConfig,
    handler: Arc<dyn FrameHandler>,
    sessions: Arc<SessionStore>,
    channels: Arc<ChannelTable>,
    transport_id: TransportId,
    state: std::sync::Mutex<TransportState>,
    metrics: AtomicMetrics,
    server_task: TokioMutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("bind_addr", &self.config.bind_addr())
            .field("state", &*self.state.lock().expect("state mutex poisoned"))
            .finish()
    }
}

impl HttpTransport {
    pub fn new(handler: Arc<dyn FrameHandler>, sessions: Arc<SessionStore>, config: HttpConfig) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            config,
            handler,
            sessions,
            channels: ChannelTable::new(),
            transport_id: TransportId::new(),
            state: std::sync::Mutex::new(TransportState::Idle),
            metrics: AtomicMetrics::default(),
            server_task: TokioMutex::new(None),
        })
    }

    pub(crate) fn http_state(&self) -> HttpState {
        HttpState {
            handler: self.handler.clone(),
            sessions: self.sessions.clone(),
            channels: self.channels.clone(),
            config: self.config.clone(),
            transport_id: self.transport_id,
            // Redirects from the upstream issuer must reach the client
            // unfollowed (spec.md §4.8: "so that authorization codes
            // round-trip through the client").
            http_client: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .expect("reqwest client builds with a fixed redirect policy"),
            self_transport: self.self_ref.clone(),
        }
    }

    fn router(&self) -> Router {
        let state = self.http_state();

        let mcp_routes = Router::new()
            .route("/mcp", post(routes::streamable::post_mcp).get(routes::streamable::get_mcp))
            .route("/sse", get(routes::legacy::get_sse))
            .route("/messages/{session_id}", post(routes::legacy::post_messages))
            .route("/{server}/{tool_name}", post(routes::openapi::call_tool))
            .layer(axum::middleware::from_fn_with_state(state.clone(), auth_guard::require_bearer_token));

        let oauth_routes = Router::new()
            .route("/.well-known/oauth-authorization-server", get(routes::oauth::authorization_server_metadata))
            .route("/.well-known/oauth-protected-resource", get(routes::oauth::protected_resource_metadata))
            .route("/.well-known/openid-configuration", get(routes::oauth::proxy_openid_configuration))
            .route("/.well-known/jwks.json", get(routes::oauth::proxy_jwks))
            .route("/authorize", axum::routing::any(routes::oauth::proxy_authorize))
            .route("/userinfo", axum::routing::any(routes::oauth::proxy_userinfo))
            .route("/oauth/{*rest}", axum::routing::any(routes::oauth::proxy_oauth));

        let manifest_routes = Router::new()
            .route("/.well-known/ai-plugin.json", get(routes::openapi::ai_plugin_manifest))
            .route("/openapi.json", get(routes::openapi::openapi_spec));

        Router::new()
            .merge(mcp_routes)
            .merge(oauth_routes)
            .merge(manifest_routes)
            .layer(cors::layer())
            .with_state(state)
    }

    fn set_state(&self, state: TransportState) {
        *self.state.lock().expect("state mutex poisoned") = state;
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::Http
    }

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities {
            bidirectional: true,
            multi_session: true,
            streaming: true,
        }
    }

    async fn state(&self) -> TransportState {
        *self.state.lock().expect("state mutex poisoned")
    }

    async fn start(&self) -> TransportResult<()> {
        self.set_state(TransportState::Connecting);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr())
            .await
            .map_err(|e| TransportError::BindingFailed(e.to_string()))?;

        let router = self.router();
        let task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router).await {
                tracing::error!(%err, "http transport server loop exited with an error");
            }
        });
        *self.server_task.lock().await = Some(task);
        self.set_state(TransportState::Connected);
        Ok(())
    }

    async fn stop(&self) -> TransportResult<()> {
        self.set_state(TransportState::Disconnecting);
        if let Some(task) = self.server_task.lock().await.take() {
            task.abort();
        }
        self.sessions.remove_all();
        self.set_state(TransportState::Disconnected);
        Ok(())
    }

    async fn send(&self, message: TransportMessage) -> TransportResult<()> {
        let delivered = self.channels.push(message.session_id, message.payload.clone());
        if delivered {
            self.metrics.record_sent(message.payload.len());
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }

    fn metrics(&self) -> TransportMetrics {
        self.metrics.snapshot()
    }

    fn endpoint(&self) -> Option<String> {
        Some(format!("http://{}", self.config.bind_addr()))
    }
}
