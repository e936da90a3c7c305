//! End-to-end coverage of the method table and batch semantics against the
//! literal scenarios in spec.md §8.

use std::sync::Arc;

use async_trait::async_trait;
use protomcp_server::{Dispatcher, Registry, Session, SessionStore, ToolCallResult, ToolHandler};
use protomcp_transport_traits::{
    Transport, TransportCapabilities, TransportId, TransportMessage, TransportMetrics,
    TransportResult, TransportState, TransportType,
};
use protomcp_types::{OrderedMap, Schema, ServerCapabilities, ServerInfo, ToolMetadata};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

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
    fn metrics(&self) -> TransportMetrics {
        TransportMetrics::default()
    }
}

struct EchoTool;

#[async_trait]
impl ToolHandler for EchoTool {
    async fn invoke(&self, args: Map<String, Value>) -> protomcp_core::Result<ToolCallResult> {
        let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
        Ok(ToolCallResult::text(text.to_string()))
    }
}

struct TestServer;

fn echo_schema() -> Schema {
    let mut properties = OrderedMap::default();
    properties.insert(
        "text".to_string(),
        Schema::String {
            format: None,
            r#enum: None,
            min_length: None,
            max_length: None,
            default: None,
        },
    );
    let mut required = BTreeSet::new();
    required.insert("text".to_string());
    Schema::Object {
        properties,
        required,
        additional_properties: false,
        default: None,
    }
}

fn build_dispatcher() -> (Dispatcher<TestServer>, Arc<Session>) {
    let registry = Arc::new(Registry::new());
    registry.register_tool::<TestServer>(ToolMetadata::new("echo", echo_schema()), Arc::new(EchoTool));
    let sessions = Arc::new(SessionStore::new());
    let session = Arc::new(Session::new(TransportId::new(), Arc::new(NullTransport)));
    sessions.insert(session.clone());

    let dispatcher = Dispatcher::<TestServer>::new(
        registry,
        sessions,
        ServerInfo {
            name: "test-server".into(),
            version: "0.1.0".into(),
            description: None,
        },
        ServerCapabilities {
            tools: true,
            ..Default::default()
        },
    );
    (dispatcher, session)
}

fn initialize_frame() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "clientInfo": {"name": "test-client", "version": "1.0"},
            "capabilities": {},
        }
    }))
    .unwrap()
}

#[tokio::test]
async fn uninitialized_session_rejects_tool_calls() {
    let (dispatcher, session) = build_dispatcher();
    let frame = serde_json::to_vec(&json!({
        "jsonrpc": "2.0", "id": 2, "method": "tools/list"
    }))
    .unwrap();

    let reply = dispatcher.handle_frame(&session, &frame).await.unwrap();
    let value: Value = serde_json::from_slice(&reply).unwrap();
    assert!(value.get("error").is_some());
}

#[tokio::test]
async fn initialize_then_call_tool_round_trips() {
    let (dispatcher, session) = build_dispatcher();

    let init_reply = dispatcher.handle_frame(&session, &initialize_frame()).await.unwrap();
    let init_value: Value = serde_json::from_slice(&init_reply).unwrap();
    assert_eq!(init_value["result"]["serverInfo"]["name"], "test-server");
    assert!(session.is_initialized());

    let call_frame = serde_json::to_vec(&json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/call",
        "params": {"name": "echo", "arguments": {"text": "hi"}},
    }))
    .unwrap();
    let reply = dispatcher.handle_frame(&session, &call_frame).await.unwrap();
    let value: Value = serde_json::from_slice(&reply).unwrap();
    assert_eq!(value["result"]["content"][0]["text"], "hi");
    assert_eq!(value["result"]["isError"], false);
}

#[tokio::test]
async fn calling_unknown_tool_is_a_protocol_error() {
    let (dispatcher, session) = build_dispatcher();
    dispatcher.handle_frame(&session, &initialize_frame()).await;

    let call_frame = serde_json::to_vec(&json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/call",
        "params": {"name": "does-not-exist", "arguments": {}},
    }))
    .unwrap();
    let reply = dispatcher.handle_frame(&session, &call_frame).await.unwrap();
    let value: Value = serde_json::from_slice(&reply).unwrap();
    assert_eq!(value["error"]["code"], -32000);
}

#[tokio::test]
async fn missing_required_argument_surfaces_as_tool_error_content() {
    let (dispatcher, session) = build_dispatcher();
    dispatcher.handle_frame(&session, &initialize_frame()).await;

    let call_frame = serde_json::to_vec(&json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/call",
        "params": {"name": "echo", "arguments": {}},
    }))
    .unwrap();
    let reply = dispatcher.handle_frame(&session, &call_frame).await.unwrap();
    let value: Value = serde_json::from_slice(&reply).unwrap();
    assert!(value.get("error").is_none());
    assert_eq!(value["result"]["isError"], true);
}

#[tokio::test]
async fn ping_works_before_initialize_in_a_mixed_batch() {
    let (dispatcher, session) = build_dispatcher();

    let batch = serde_json::to_vec(&json!([
        {"jsonrpc": "2.0", "id": 1, "method": "ping"},
        {"jsonrpc": "2.0", "method": "notifications/initialized"}
    ]))
    .unwrap();
    let reply = dispatcher.handle_frame(&session, &batch).await.unwrap();
    let value: Value = serde_json::from_slice(&reply).unwrap();
    assert_eq!(value["jsonrpc"], "2.0");
    assert_eq!(value["id"], 1);
    assert_eq!(value["result"], json!({}));
}

#[tokio::test]
async fn batch_of_only_notifications_produces_no_reply() {
    let (dispatcher, session) = build_dispatcher();
    dispatcher.handle_frame(&session, &initialize_frame()).await;

    let batch = serde_json::to_vec(&json!([
        {"jsonrpc": "2.0", "method": "notifications/initialized"}
    ]))
    .unwrap();
    let reply = dispatcher.handle_frame(&session, &batch).await;
    assert!(reply.is_none());
}

#[tokio::test]
async fn unknown_method_is_method_not_found() {
    let (dispatcher, session) = build_dispatcher();
    dispatcher.handle_frame(&session, &initialize_frame()).await;

    let frame = serde_json::to_vec(&json!({
        "jsonrpc": "2.0", "id": 9, "method": "nonexistent/method"
    }))
    .unwrap();
    let reply = dispatcher.handle_frame(&session, &frame).await.unwrap();
    let value: Value = serde_json::from_slice(&reply).unwrap();
    assert_eq!(value["error"]["code"], -32601);
}

#[tokio::test]
async fn malformed_json_yields_parse_error_with_null_id() {
    let (dispatcher, session) = build_dispatcher();
    let reply = dispatcher.handle_frame(&session, b"{not json").await.unwrap();
    let value: Value = serde_json::from_slice(&reply).unwrap();
    assert_eq!(value["error"]["code"], -32700);
    assert_eq!(value["id"], Value::Null);
}
