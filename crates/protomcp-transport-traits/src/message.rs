//! The envelope a [`crate::Transport`] moves: a raw encoded frame plus the
//! session it belongs to.

use bytes::Bytes;
use uuid::Uuid;

/// One frame of wire data in or out of a transport, tagged with the session
/// it arrived on (or should be sent to).
#[derive(Debug, Clone)]
pub struct TransportMessage {
    /// The session this frame is associated with.
    pub session_id: Uuid,
    /// The raw encoded JSON-RPC frame (a single message or a batch array).
    pub payload: Bytes,
}

impl TransportMessage {
    pub fn new(session_id: Uuid, payload: impl Into<Bytes>) -> Self {
        Self {
            session_id,
            payload: payload.into(),
        }
    }
}
