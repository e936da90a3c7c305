//! SSE frame formatting and the per-session streaming-channel table
//! (spec.md §4.7, §6, §8 "SSE frames emitted by the server always terminate
//! with `\n\n`").

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use uuid::Uuid;

/// `event: NAME\n` (optional) `data: PAYLOAD\n\n`, per spec.md §6's exact
/// framing grammar. This core always emits each JSON payload on a single
/// line, so `data:` never needs to be repeated per line.
pub fn format_event(event: Option<&str>, data: &str) -> String {
    match event {
        Some(name) => format!("event: {name}\ndata: {data}\n\n"),
        None => format!("data: {data}\n\n"),
    }
}

/// `: keep-alive\n` comment line used by the `sse-comment` keep-alive mode.
pub const COMMENT_KEEPALIVE: &str = ": keep-alive\n\n";

/// One session's attached SSE push channel. Replacing an entry supersedes
/// whichever stream previously held it (spec.md §3: "a session never has
/// more than one active streaming channel of each kind simultaneously") —
/// the generation counter lets the superseded stream task notice and stop
/// pushing frames of its own.
#[derive(Clone)]
pub struct SseChannel {
    pub tx: tokio::sync::mpsc::UnboundedSender<Bytes>,
    generation: u64,
}

/// Session id → attached SSE channel. Shared between the transport's `send`
/// implementation (which pushes frames here) and whichever route holds the
/// live stream (which drains them).
#[derive(Default)]
pub struct ChannelTable {
    channels: DashMap<Uuid, SseChannel>,
    next_generation: AtomicU64,
}

impl ChannelTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Attach a fresh channel for `session_id`, superseding any previous one.
    /// Returns the generation the caller's stream loop must keep checking
    /// against.
    pub fn attach(&self, session_id: Uuid) -> (tokio::sync::mpsc::UnboundedReceiver<Bytes>, u64) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        self.channels.insert(session_id, SseChannel { tx, generation });
        (rx, generation)
    }

    /// `true` while `generation` is still the live channel for `session_id`
    /// — a stream loop uses this to know when it has been superseded and
    /// should stop pushing frames.
    pub fn is_current(&self, session_id: Uuid, generation: u64) -> bool {
        self.channels
            .get(&session_id)
            .map(|entry| entry.generation == generation)
            .unwrap_or(false)
    }

    pub fn push(&self, session_id: Uuid, bytes: Bytes) -> bool {
        match self.channels.get(&session_id) {
            Some(entry) => entry.tx.send(bytes).is_ok(),
            None => false,
        }
    }

    pub fn detach(&self, session_id: Uuid, generation: u64) {
        if self.is_current(session_id, generation) {
            self.channels.remove(&session_id);
        }
    }

    pub fn has_channel(&self, session_id: Uuid) -> bool {
        self.channels.contains_key(&session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_events_terminate_with_blank_line() {
        assert_eq!(format_event(Some("endpoint"), "/messages/abc"), "event: endpoint\ndata: /messages/abc\n\n");
        assert_eq!(format_event(None, "{}"), "data: {}\n\n");
    }

    #[tokio::test]
    async fn attaching_a_new_channel_supersedes_the_old_generation() {
        let table = ChannelTable::new();
        let session_id = Uuid::new_v4();
        let (_rx1, gen1) = table.attach(session_id);
        assert!(table.is_current(session_id, gen1));

        let (_rx2, gen2) = table.attach(session_id);
        assert!(!table.is_current(session_id, gen1));
        assert!(table.is_current(session_id, gen2));
    }

    #[tokio::test]
    async fn push_delivers_to_the_current_receiver() {
        let table = ChannelTable::new();
        let session_id = Uuid::new_v4();
        let (mut rx, _gen) = table.attach(session_id);
        assert!(table.push(session_id, Bytes::from_static(b"hello")));
        let received = rx.recv().await.unwrap();
        assert_eq!(&received[..], b"hello");
    }
}
