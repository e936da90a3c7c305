//! MCP server dispatch core: the tool/resource/prompt registry (C2), the
//! session store (C3), and JSON-RPC method routing (C9).
//!
//! This crate is transport-agnostic: it consumes `protomcp-transport-traits`
//! to deliver replies but never opens a socket or reads stdin itself. A
//! concrete transport crate (`protomcp-stdio`, `protomcp-tcp`,
//! `protomcp-http`) owns the connection and hands this crate raw frames via
//! [`dispatch::Dispatcher::handle_frame`].

#![warn(missing_docs, rust_2018_idioms, clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod session;

pub use dispatch::Dispatcher;
pub use error::{to_error_message, Error, Result, ToolError};
pub use registry::{
    enrich_arguments, PromptContents, PromptHandler, Registry, ResourceContents, ResourceHandler,
    ToolCallResult, ToolHandler,
};
pub use session::{Session, SessionStore};
