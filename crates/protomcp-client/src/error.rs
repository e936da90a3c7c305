//! Errors the client proxy can raise: transport failures, protocol
//! violations from the remote peer, and JSON-RPC error responses relayed
//! back from the server (spec.md §4.10, §7).

use protomcp_types::RpcError;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Failures the client proxy can surface to its caller.
#[derive(Debug, thiserror::Error, Clone)]
pub enum ClientError {
    /// The underlying transport failed to connect, read, or write.
    #[error("transport error: {0}")]
    Transport(String),

    /// A frame received from the server didn't decode as a JSON-RPC message.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server answered a request with a JSON-RPC error object.
    #[error("server error {code}: {message}")]
    Server {
        /// The JSON-RPC error code.
        code: i64,
        /// The error's human-readable message.
        message: String,
        /// Any structured detail the server attached.
        data: Option<serde_json::Value>,
    },

    /// The connection closed (or a server→client request hit its timeout)
    /// while a request was still pending. Spec.md §5 and §8 require the
    /// message to be this exact, stable string.
    #[error("Connection closed by server before response was received")]
    ConnectionClosed,

    /// `call_tool`/`read_resource`/etc. were invoked before `initialize`.
    #[error("client is not initialized; call `initialize` first")]
    NotInitialized,

    /// The server sent something the client was never equipped to parse,
    /// e.g. a `sampling/createMessage` request with no handler registered.
    #[error("unsupported request from server: {0}")]
    Unsupported(String),
}

impl From<protomcp_transport_traits::TransportError> for ClientError {
    fn from(err: protomcp_transport_traits::TransportError) -> Self {
        match err {
            protomcp_transport_traits::TransportError::ConnectionClosed => Self::ConnectionClosed,
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<RpcError> for ClientError {
    fn from(err: RpcError) -> Self {
        Self::Server {
            code: err.code,
            message: err.message,
            data: err.data,
        }
    }
}
