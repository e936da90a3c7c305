//! The core `Transport` trait every concrete transport implements.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::TransportResult;
use crate::message::TransportMessage;
use crate::metrics::TransportMetrics;
use crate::types::{TransportCapabilities, TransportState, TransportType};

/// A bidirectional, message-based communication channel between this
/// process and zero or more peers. Each concrete transport (stdio, TCP,
/// HTTP+SSE) implements this the way its framing demands, but the
/// dispatcher only ever talks to `dyn Transport`.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    fn transport_type(&self) -> TransportType;

    fn capabilities(&self) -> TransportCapabilities;

    async fn state(&self) -> TransportState;

    /// Begin accepting connections / reading frames. Returns once the
    /// transport is ready; actual I/O runs on spawned tasks.
    async fn start(&self) -> TransportResult<()>;

    /// Tear the transport down: stop accepting, close every session.
    async fn stop(&self) -> TransportResult<()>;

    /// Write one frame to a specific session's outbound channel.
    async fn send(&self, message: TransportMessage) -> TransportResult<()>;

    /// A snapshot of this transport's counters.
    fn metrics(&self) -> TransportMetrics;

    /// A human-readable address/endpoint, if this transport has one.
    fn endpoint(&self) -> Option<String> {
        None
    }
}

/// Produces fresh [`Transport`] instances from configuration — mirrors the
/// teacher's `TransportFactory`, used by an embedding CLI (excluded
/// collaborator) to wire a configured transport kind into the runtime.
pub trait TransportFactory: Send + Sync {
    fn transport_type(&self) -> TransportType;
    fn is_available(&self) -> bool {
        true
    }
}

/// What a transport hands each inbound frame to. Implemented by
/// `protomcp-server::Dispatcher`; kept here as a trait so no concrete
/// transport crate needs to depend on `protomcp-server` (mirrors the
/// session↔transport decoupling spec.md §9 asks for, applied one layer up).
#[async_trait]
pub trait FrameHandler: Send + Sync {
    /// Handle one raw frame (a single JSON object or a batch array) read
    /// from `session_id`'s connection. Returns the encoded reply frame, if
    /// the batch produced any (pure-notification batches produce none).
    async fn handle_frame(&self, session_id: Uuid, bytes: &[u8]) -> Option<Vec<u8>>;

    /// Called once a session's transport is ready to send, so the handler
    /// can register the `(session_id, transport)` pair before any frame
    /// arrives.
    fn session_opened(&self, session_id: Uuid, transport_id: TransportId, transport: std::sync::Arc<dyn Transport>);

    /// Called when a session's connection is torn down, so the handler can
    /// cancel that session's outstanding server→client continuations.
    fn session_closed(&self, session_id: Uuid);
}

/// Stable identifier for a transport instance, used as the session's "weak"
/// back-reference (spec.md §9: "implement as a lookup key... not a cyclic
/// owning pointer").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportId(pub Uuid);

impl TransportId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransportId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _object_safe(_t: &dyn Transport) {}

    #[test]
    fn transport_ids_are_unique() {
        assert_ne!(TransportId::new(), TransportId::new());
    }
}
