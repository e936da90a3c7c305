//! The high-level client proxy (component C10, spec.md §4.10): consumes a
//! remote MCP server's tools, resources, and prompts over any
//! [`ClientTransport`], negotiating capabilities once via `initialize` and
//! answering server-initiated sampling/elicitation requests in the
//! background.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use protomcp_types::{ClientCapabilities, ClientInfo, ServerCapabilities, ServerInfo, PROTOCOL_VERSION};

use crate::error::{ClientError, Result};
use crate::handlers::{ElicitationHandler, SamplingHandler};
use crate::protocol::Protocol;
use crate::transport::ClientTransport;

/// Result of a completed `initialize` handshake.
#[derive(Debug, Clone)]
pub struct InitializeOutcome {
    /// The server's self-reported name, version, and description.
    pub server_info: ServerInfo,
    /// Which MCP feature areas the server advertised support for.
    pub server_capabilities: ServerCapabilities,
}

/// A tool result: `{content: [...], isError}` (spec.md §4.9 `tools/call`).
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// The tool's output content blocks.
    pub content: Vec<Value>,
    /// Set when the tool failed; `content` then holds the error text.
    #[serde(default)]
    pub is_error: bool,
}

/// A prompt result: `{description?, messages: [...]}` (spec.md §4.9 `prompts/get`).
#[derive(Debug, Clone, serde::Deserialize)]
pub struct GetPromptResult {
    /// Optional human-readable description of the rendered prompt.
    pub description: Option<String>,
    /// The rendered message list.
    pub messages: Vec<Value>,
}

/// A resource read: `{contents: [...]}` (spec.md §4.9 `resources/read`).
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ReadResourceResult {
    /// The resource's contents, one entry per URI segment it covers.
    pub contents: Vec<Value>,
}

/// A completion suggestion list (spec.md §4.9 `completion/complete`).
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    /// Suggested completion values, in priority order.
    pub values: Vec<String>,
    /// Total number of matches, if the server knows it.
    pub total: Option<u64>,
    /// Whether more matches exist beyond `values`.
    pub has_more: Option<bool>,
}

/// An MCP client proxy. Cheap to clone — cloning shares the same connection,
/// pending-request table, and background routing task.
pub struct Client<T: ClientTransport + 'static> {
    protocol: Arc<Protocol<T>>,
    initialized: Arc<AtomicBool>,
    client_info: ClientInfo,
}

impl<T: ClientTransport + 'static> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            protocol: self.protocol.clone(),
            initialized: self.initialized.clone(),
            client_info: self.client_info.clone(),
        }
    }
}

impl<T: ClientTransport + 'static> Client<T> {
    /// Wrap a transport and start its background routing task. The
    /// connection isn't usable for MCP operations until [`Client::initialize`]
    /// completes.
    pub fn new(transport: T) -> Self {
        Self::with_client_info(
            transport,
            ClientInfo {
                name: "protomcp-client".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        )
    }

    /// Same as [`Client::new`] with a caller-supplied `clientInfo` identity.
    pub fn with_client_info(transport: T, client_info: ClientInfo) -> Self {
        Self {
            protocol: Protocol::new(Arc::new(transport)),
            initialized: Arc::new(AtomicBool::new(false)),
            client_info,
        }
    }

    /// Register the handler that answers `sampling/createMessage` requests
    /// from the server. Must be called before [`Client::initialize`] for the
    /// negotiated capability to reflect it.
    pub fn set_sampling_handler(&self, handler: impl SamplingHandler + 'static) {
        self.protocol.handlers().lock().unwrap().set_sampling_handler(handler);
    }

    /// Register the handler that answers `elicitation/create` requests.
    pub fn set_elicitation_handler(&self, handler: impl ElicitationHandler + 'static) {
        self.protocol.handlers().lock().unwrap().set_elicitation_handler(handler);
    }

    /// Register a callback invoked for every `notifications/progress` frame.
    pub fn on_progress(&self, handler: impl Fn(Value) + Send + Sync + 'static) {
        self.protocol.handlers().lock().unwrap().set_progress_handler(handler);
    }

    /// Register a callback invoked for every `notifications/message` frame.
    pub fn on_log(&self, handler: impl Fn(Value) + Send + Sync + 'static) {
        self.protocol.handlers().lock().unwrap().set_log_handler(handler);
    }

    fn require_initialized(&self) -> Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(ClientError::NotInitialized)
        }
    }

    /// Perform the MCP handshake: send `initialize`, then
    /// `notifications/initialized`. Capabilities advertised to the server
    /// reflect whichever sampling/elicitation handlers are registered.
    pub async fn initialize(&self) -> Result<InitializeOutcome> {
        let handlers = self.protocol.handlers().lock().unwrap();
        let mut capabilities = ClientCapabilities::default();
        capabilities.sampling = handlers.has_sampling();
        capabilities.elicitation = handlers.has_elicitation();
        drop(handlers);

        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": capabilities,
            "clientInfo": self.client_info,
        });
        let result = self.protocol.request("initialize", Some(params)).await?;

        let server_info: ServerInfo = serde_json::from_value(
            result.get("serverInfo").cloned().ok_or_else(|| ClientError::Protocol("initialize result missing serverInfo".into()))?,
        )?;
        let server_capabilities: ServerCapabilities = result
            .get("capabilities")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();

        self.initialized.store(true, Ordering::Release);
        self.protocol.notify("notifications/initialized", None).await?;

        Ok(InitializeOutcome { server_info, server_capabilities })
    }

    /// `tools/list`.
    pub async fn list_tools(&self) -> Result<Vec<Value>> {
        self.require_initialized()?;
        let result = self.protocol.request("tools/list", None).await?;
        extract_array(&result, "tools")
    }

    /// `tools/call`.
    pub async fn call_tool(&self, name: &str, arguments: Option<Value>) -> Result<CallToolResult> {
        self.require_initialized()?;
        let params = json!({ "name": name, "arguments": arguments.unwrap_or(json!({})) });
        let result = self.protocol.request("tools/call", Some(params)).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// `resources/list`.
    pub async fn list_resources(&self) -> Result<Vec<Value>> {
        self.require_initialized()?;
        let result = self.protocol.request("resources/list", None).await?;
        extract_array(&result, "resources")
    }

    /// `resources/read`.
    pub async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult> {
        self.require_initialized()?;
        let params = json!({ "uri": uri });
        let result = self.protocol.request("resources/read", Some(params)).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// `prompts/list`.
    pub async fn list_prompts(&self) -> Result<Vec<Value>> {
        self.require_initialized()?;
        let result = self.protocol.request("prompts/list", None).await?;
        extract_array(&result, "prompts")
    }

    /// `prompts/get`.
    pub async fn get_prompt(&self, name: &str, arguments: Option<Value>) -> Result<GetPromptResult> {
        self.require_initialized()?;
        let mut params = json!({ "name": name });
        if let Some(arguments) = arguments {
            params["arguments"] = arguments;
        }
        let result = self.protocol.request("prompts/get", Some(params)).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// `completion/complete`.
    pub async fn complete(&self, reference: Value, argument: Value) -> Result<CompletionResult> {
        self.require_initialized()?;
        let params = json!({ "ref": reference, "argument": argument });
        let result = self.protocol.request("completion/complete", Some(params)).await?;
        let completion = result
            .get("completion")
            .cloned()
            .ok_or_else(|| ClientError::Protocol("completion result missing `completion`".into()))?;
        Ok(serde_json::from_value(completion)?)
    }

    /// `logging/setLevel`.
    pub async fn set_log_level(&self, level: &str) -> Result<()> {
        self.require_initialized()?;
        let params = json!({ "level": level });
        self.protocol.request("logging/setLevel", Some(params)).await?;
        Ok(())
    }

    /// Sends a `ping` request and waits for the server's empty reply;
    /// useful for liveness checks independent of any MCP operation.
    pub async fn ping(&self) -> Result<()> {
        self.protocol.request("ping", None).await?;
        Ok(())
    }
}

fn extract_array(result: &Value, key: &str) -> Result<Vec<Value>> {
    result
        .get(key)
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| ClientError::Protocol(format!("result missing `{key}` array")))
}
