//! Wire types for the Model Context Protocol: the JSON-RPC 2.0 message
//! model, the recursive schema type, and tool/resource/prompt metadata
//! shapes. This crate has no async runtime dependency; it is pure data plus
//! (de)serialization.

#![warn(missing_docs, rust_2018_idioms, clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod id;
mod log;
mod message;
mod metadata;
mod schema;

pub use id::{Id, IdSequence};
pub use log::LogLevel;
pub use message::{
    canonicalize, error_code, ErrorResponse, Message, Notification, Request, Response, RpcError,
    JSONRPC_VERSION,
};
pub use metadata::{
    ClientCapabilities, ClientInfo, ContentBlock, PromptMessage, PromptMetadata, PromptRole,
    ResourceMetadata, ServerCapabilities, ServerInfo, ToolAnnotations, ToolMetadata,
    PROTOCOL_VERSION,
};
pub use schema::{indexmap_like::OrderedMap, Schema};
