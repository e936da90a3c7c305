//! Unified error type for protomcp, mapping onto the JSON-RPC error codes
//! and the taxonomy in spec.md §7.

use protomcp_types::{error_code, RpcError};

/// Result alias used throughout the runtime.
pub type Result<T> = std::result::Result<T, Error>;

/// A single error type covering decode/protocol failures, tool-domain
/// failures, and authorization failures. Transport-specific errors
/// (connection reset, bind failure) live in `protomcp-transport-traits`
/// instead, since those never cross the wire as JSON-RPC errors
/// (spec.md §7: "Transport... Surface to the outer operator; not sent to
/// the peer.").
#[derive(Debug, thiserror::Error, Clone)]
pub enum Error {
    /// Malformed JSON on the wire (`-32700`).
    #[error("Parse error: {0}")]
    Parse(String),

    /// Well-formed JSON that isn't a valid JSON-RPC message (`-32600`).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No handler registered for the method (`-32601`).
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Params failed validation (`-32602`).
    #[error("Invalid params: {message}")]
    InvalidParams {
        message: String,
        /// Structured detail, e.g. `{"parameter": "b"}`.
        data: Option<serde_json::Value>,
    },

    /// Handler raised an unexpected error (`-32603`).
    #[error("Internal error: {0}")]
    Internal(String),

    /// A tool/resource/prompt domain failure, rendered as `isError: true`
    /// content rather than a JSON-RPC error (spec.md §7).
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Authorization failed; carries the reason shown to the caller.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// Tool/resource/prompt domain errors (spec.md §7).
#[derive(Debug, thiserror::Error, Clone)]
pub enum ToolError {
    #[error("Unknown tool '{0}'")]
    UnknownTool(String),

    #[error("Argument '{param}': expected {expected}, got {actual}")]
    InvalidArgumentType {
        param: String,
        expected: String,
        actual: String,
    },

    #[error("Missing required parameter '{0}'")]
    MissingRequiredParameter(String),

    #[error("Tool '{name}' call failed: {reason}")]
    ToolCallFailed { name: String, reason: String },
}

impl Error {
    /// Render this error as a JSON-RPC `error` object (spec.md §7).
    pub fn to_rpc_error(&self) -> RpcError {
        match self {
            Error::Parse(msg) => RpcError::new(error_code::PARSE_ERROR, msg.clone()),
            Error::InvalidRequest(msg) => RpcError::new(error_code::INVALID_REQUEST, msg.clone()),
            Error::MethodNotFound(method) => {
                RpcError::new(error_code::METHOD_NOT_FOUND, "Method not found".to_string())
                    .with_data(serde_json::json!({ "method": method }))
            }
            Error::InvalidParams { message, data } => {
                let err = RpcError::new(error_code::INVALID_PARAMS, message.clone());
                match data {
                    Some(d) => err.with_data(d.clone()),
                    None => err,
                }
            }
            Error::Internal(msg) => RpcError::new(error_code::INTERNAL_ERROR, msg.clone()),
            Error::Tool(tool_err) => {
                RpcError::new(error_code::SERVER_ERROR, tool_err.to_string())
            }
            Error::Unauthorized(reason) => RpcError::new(
                error_code::UNAUTHORIZED,
                format!("Unauthorized: {reason}"),
            ),
        }
    }

    /// Convenience constructor for a missing-required-parameter tool error,
    /// used directly by the registry (spec.md §4.2).
    pub fn missing_required_parameter(name: impl Into<String>) -> Self {
        Error::Tool(ToolError::MissingRequiredParameter(name.into()))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Error::InvalidParams {
            message: message.into(),
            data: None,
        }
    }
}
