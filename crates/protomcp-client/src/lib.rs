//! The MCP client proxy (spec.md §4.10, component C10): the consumer side
//! of the protocol — dials a server over stdio, TCP, or HTTP+SSE, performs
//! the `initialize` handshake, and exposes tool/resource/prompt operations
//! plus hooks for the requests a server can send back (`ping`,
//! `sampling/createMessage`, `elicitation/create`).
//!
//! Unlike the server side (`protomcp-server`, `protomcp-transport-traits`),
//! where a [`protomcp_transport_traits::Transport`] pushes frames into a
//! registered [`protomcp_transport_traits::FrameHandler`], this crate reads
//! by pulling: [`transport::ClientTransport::receive`] is polled by a single
//! background task ([`protocol::Protocol`]) that correlates replies with
//! their requests and dispatches anything else to user-supplied handlers.

#![warn(missing_docs, rust_2018_idioms, clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod error;
mod handlers;
mod protocol;
pub mod transport;

pub use client::{CallToolResult, Client, CompletionResult, GetPromptResult, InitializeOutcome, ReadResourceResult};
pub use error::{ClientError, Result};
pub use handlers::{ElicitationHandler, HandlerRegistry, LogHandler, ProgressHandler, SamplingHandler};
pub use transport::{ClientTransport, HttpClientTransport, StdioClientTransport, StdioCommandConfig, TcpClientTransport};
