//! HTTP transport configuration (spec.md §4.7, §6, component C7).

use std::sync::Arc;
use std::time::Duration;

use protomcp_auth::{OAuthConfig, ProtectedResourceMetadata};

use crate::manifest::ManifestProvider;

/// How the keep-alive timer behaves on an open SSE stream (spec.md §4.7:
/// "three modes").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAliveMode {
    /// No keep-alive traffic at all.
    Off,
    /// Emit an `: keep-alive` SSE comment line on every tick.
    SseComment,
    /// Issue a server→client `ping` JSON-RPC request on every tick.
    Ping,
}

/// Keep-alive timer configuration. Default period is 30s (spec.md §4.7).
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    pub mode: KeepAliveMode,
    pub period: Duration,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            mode: KeepAliveMode::SseComment,
            period: Duration::from_secs(30),
        }
    }
}

/// Everything the HTTP transport needs beyond the generic
/// [`protomcp_transport_traits::TransportConfig`] (spec.md §4.7).
#[derive(Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// Lowercased server name, used as `<server>` in the OpenAPI tool-call
    /// route (spec.md §6: `POST /<server>/<tool-name>`).
    pub server_name: String,
    pub server_description: Option<String>,
    pub keep_alive: KeepAliveConfig,
    pub oauth: Option<Arc<OAuthConfig>>,
    pub protected_resource: Option<ProtectedResourceMetadata>,
    /// The OpenAI plugin callback id forwarded in the `.well-known/ai-plugin.json`
    /// manifest, if the provider builds one that needs it. Spec.md §9 flags the
    /// teacher's hardcoded `g-…` literal as a bug; this field is how an embedder
    /// supplies it instead.
    pub plugin_id: Option<String>,
    pub manifest_provider: Option<Arc<dyn ManifestProvider>>,
    pub max_body_bytes: usize,
}

impl HttpConfig {
    pub fn new(host: impl Into<String>, port: u16, server_name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            server_name: server_name.into().to_lowercase(),
            server_description: None,
            keep_alive: KeepAliveConfig::default(),
            oauth: None,
            protected_resource: None,
            plugin_id: None,
            manifest_provider: None,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }

    pub fn with_oauth(mut self, oauth: Arc<OAuthConfig>) -> Self {
        self.oauth = Some(oauth);
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: KeepAliveConfig) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_manifest_provider(mut self, provider: Arc<dyn ManifestProvider>) -> Self {
        self.manifest_provider = Some(provider);
        self
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
