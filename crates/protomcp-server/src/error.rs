//! Server-facing error/result aliases. Dispatch never invents its own error
//! taxonomy; it reuses `protomcp_core::Error` throughout and only adds the
//! mapping into a wire [`protomcp_types::Message`].

pub use protomcp_core::{Error, Result, ToolError};
use protomcp_types::{Id, Message};

/// Render `err` as the JSON-RPC error reply for `id` (spec.md §7).
pub fn to_error_message(id: Option<Id>, err: &Error) -> Message {
    Message::error(id, err.to_rpc_error())
}
