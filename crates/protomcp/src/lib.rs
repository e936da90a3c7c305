//! protomcp: a Model Context Protocol runtime — message codec, session and
//! dispatch core, stdio/TCP/HTTP+SSE transports, an OAuth2/JWT proxy, and a
//! client proxy, assembled behind one crate.
//!
//! This crate is a thin facade: it re-exports the public surface of its
//! constituent crates and adds the one thing none of them owns on its own —
//! the [`providers`] traits describing the tool/resource/prompt
//! implementations a [`protomcp_server::registry::Registry`] consumes.
//! Pull in an individual `protomcp-*` crate directly if you only need one
//! layer (e.g. a standalone stdio client with no server side).

#![warn(missing_docs, rust_2018_idioms, clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod providers;

pub use protomcp_core::{
    bind_session, current_session, elicit, report_progress, sample, send_prompt_list_changed,
    send_resource_list_changed, send_tool_list_changed, classify, codec, context, decode_batch,
    encode, encode_batch, encode_float, encode_timestamp, Classification, ContextError, Error,
    RequestContext, Result, SessionHandle, ToolError,
};
pub use protomcp_types::{
    canonicalize, error_code, ClientCapabilities, ClientInfo, ContentBlock, Id, IdSequence,
    JSONRPC_VERSION, LogLevel, Message, Notification, OrderedMap, PromptMessage, PromptMetadata,
    PromptRole, Request, ResourceMetadata, Response, RpcError, Schema, ServerCapabilities,
    ServerInfo, ToolAnnotations, ToolMetadata, ErrorResponse, PROTOCOL_VERSION,
};
pub use protomcp_transport_traits::{
    AtomicMetrics, FrameHandler, Transport, TransportCapabilities, TransportConfig, TransportError,
    TransportFactory, TransportId, TransportMessage, TransportMetrics, TransportResult,
    TransportState, TransportType,
};
pub use protomcp_server::{
    enrich_arguments, to_error_message, Dispatcher, PromptContents, PromptHandler, Registry,
    ResourceContents, ResourceHandler, Session, SessionStore, ToolCallResult, ToolHandler,
};
pub use protomcp_stdio::{StdioTransport, StdioTransportFactory};
pub use protomcp_tcp::{browse, Advertisement, DiscoveredService, TcpTransport, TcpTransportFactory, DEFAULT_SERVICE_TYPE};
pub use protomcp_http::{HttpConfig, HttpState, HttpTransport, KeepAliveConfig, KeepAliveMode, ManifestProvider};
pub use protomcp_client::{
    CallToolResult, Client, ClientError, ClientTransport, CompletionResult, ElicitationHandler,
    GetPromptResult, HandlerRegistry, HttpClientTransport, InitializeOutcome, LogHandler,
    ProgressHandler, ReadResourceResult, SamplingHandler, StdioClientTransport,
    StdioCommandConfig, TcpClientTransport,
};

#[cfg(feature = "auth")]
pub use protomcp_auth::{
    Authorization, AuthError, JwksClient, JwtValidationResult, JwtValidator, OAuthConfig,
    ProtectedResourceMetadata, ProtectedResourceMetadataDoc, TokenValidator,
};

pub use providers::{
    register_prompt_provider, register_resource_provider, register_tool_provider, PromptProvider,
    ResourceProvider, ToolProvider,
};
