//! Transport-level errors. These never cross the wire as JSON-RPC errors
//! (spec.md §7) — they are surfaced to the operator embedding the
//! transport, logged, and in the case of a single connection, cause that
//! connection to be torn down.

/// Result alias for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Transport-layer failures.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to bind listener: {0}")]
    BindingFailed(String),

    #[error("Communication error: {0}")]
    CommunicationError(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Transport is not connected")]
    NotConnected,

    #[error("Connection closed by server before response was received")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
