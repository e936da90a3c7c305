//! Inbound HTTP request assembly (spec.md §4.7: "Idle → Head(h) on HEAD →
//! Body(h,buf) on BODY → Dispatch on END → Idle").
//!
//! Spec.md §9 flags two competing behaviors found in the source this was
//! distilled from: one path fully accumulates every body chunk before
//! dispatch, the other keeps only the most recently received chunk
//! ("last-buffer-wins"), silently dropping everything before it. The
//! accumulating path is correct; [`BodyAssembly`] only implements that one.

use bytes::{Bytes, BytesMut};

/// One HTTP request's head, as far as this assembly state machine cares.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: String,
    pub path: String,
}

/// The per-connection state machine driving one request's body assembly.
#[derive(Debug)]
pub enum BodyAssembly {
    Idle,
    Head(RequestHead),
    Body(RequestHead, BytesMut),
    Dispatch(RequestHead, Bytes),
}

impl Default for BodyAssembly {
    fn default() -> Self {
        Self::Idle
    }
}

impl BodyAssembly {
    pub fn new() -> Self {
        Self::Idle
    }

    /// A request head arrived. Valid from `Idle` only; starting a new head
    /// while mid-body abandons whatever was being accumulated and warns,
    /// since a well-formed client never interleaves requests on the same
    /// assembly.
    pub fn feed_head(&mut self, head: RequestHead) {
        if !matches!(self, BodyAssembly::Idle) {
            tracing::warn!("request head arrived before the previous body finished; resetting assembly");
        }
        *self = BodyAssembly::Head(head);
    }

    /// A body chunk arrived. Every chunk since the head is appended in
    /// order — this is the "full accumulation" behavior spec.md §9 selects.
    /// A chunk with no preceding head is discarded with a warning.
    pub fn feed_chunk(&mut self, chunk: &[u8]) {
        match std::mem::replace(self, BodyAssembly::Idle) {
            BodyAssembly::Head(head) => {
                let mut buf = BytesMut::with_capacity(chunk.len());
                buf.extend_from_slice(chunk);
                *self = BodyAssembly::Body(head, buf);
            }
            BodyAssembly::Body(head, mut buf) => {
                buf.extend_from_slice(chunk);
                *self = BodyAssembly::Body(head, buf);
            }
            BodyAssembly::Idle => {
                tracing::warn!("body chunk arrived with no preceding head; discarding");
            }
            other @ BodyAssembly::Dispatch(..) => {
                tracing::warn!("body chunk arrived while a previous request was awaiting dispatch; discarding");
                *self = other;
            }
        }
    }

    /// The body is complete; transition to `Dispatch` and return the
    /// assembled frame, resetting to `Idle` for the next request.
    pub fn finish(&mut self) -> Option<(RequestHead, Bytes)> {
        match std::mem::replace(self, BodyAssembly::Idle) {
            BodyAssembly::Body(head, buf) => Some((head, buf.freeze())),
            BodyAssembly::Head(head) => Some((head, Bytes::new())),
            BodyAssembly::Idle | BodyAssembly::Dispatch(..) => {
                tracing::warn!("request end reached with no body in progress");
                None
            }
        }
    }
}

/// Accumulate an axum request body into one contiguous [`Bytes`], capping
/// total size at `max_bytes`, routed through [`BodyAssembly`] so the
/// accumulation discipline above is what actually produces the frame handed
/// to the dispatcher rather than a parallel, untested code path.
pub async fn accumulate(
    body: axum::body::Body,
    head: RequestHead,
    max_bytes: usize,
) -> Result<Bytes, String> {
    let bytes = axum::body::to_bytes(body, max_bytes)
        .await
        .map_err(|e| e.to_string())?;

    let mut assembly = BodyAssembly::new();
    assembly.feed_head(head);
    assembly.feed_chunk(&bytes);
    Ok(assembly.finish().map(|(_, bytes)| bytes).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head() -> RequestHead {
        RequestHead {
            method: "POST".into(),
            path: "/mcp".into(),
        }
    }

    #[test]
    fn accumulates_every_chunk_in_order() {
        let mut assembly = BodyAssembly::new();
        assembly.feed_head(head());
        assembly.feed_chunk(b"{\"a\":");
        assembly.feed_chunk(b"1}");
        let (_, bytes) = assembly.finish().expect("body assembled");
        assert_eq!(&bytes[..], b"{\"a\":1}");
    }

    #[test]
    fn chunk_without_head_is_discarded_not_promoted() {
        let mut assembly = BodyAssembly::new();
        assembly.feed_chunk(b"orphaned");
        assert!(matches!(assembly, BodyAssembly::Idle));
    }

    #[test]
    fn new_head_mid_body_resets_instead_of_merging() {
        let mut assembly = BodyAssembly::new();
        assembly.feed_head(head());
        assembly.feed_chunk(b"partial");
        assembly.feed_head(head());
        assembly.feed_chunk(b"fresh");
        let (_, bytes) = assembly.finish().expect("body assembled");
        assert_eq!(&bytes[..], b"fresh");
    }

    #[test]
    fn finish_without_body_in_progress_yields_nothing() {
        let mut assembly = BodyAssembly::new();
        assert!(assembly.finish().is_none());
    }
}
