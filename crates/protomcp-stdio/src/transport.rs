//! [`StdioTransport`]: newline-delimited JSON over stdin/stdout.
//!
//! Follows the hybrid interior-mutability split used throughout this
//! workspace: `std::sync::Mutex` for the rarely-touched lifecycle state,
//! `AtomicMetrics` for hot per-message counters, `tokio::sync::Mutex` only
//! for the pieces that must cross an `.await` (the writer half, the reader
//! task handle).

use std::pin::Pin;
use std::sync::{Arc, Mutex as StdMutex, Weak};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::Mutex as TokioMutex;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use protomcp_transport_traits::{
    AtomicMetrics, FrameHandler, Transport, TransportCapabilities, TransportError, TransportFactory,
    TransportId, TransportMessage, TransportMetrics, TransportResult, TransportState, TransportType,
};

type BoxedRead = Pin<Box<dyn AsyncRead + Send + Sync>>;
type BoxedWrite = Pin<Box<dyn AsyncWrite + Send + Sync>>;

enum StreamSource {
    ProcessStdio,
    Raw { reader: BoxedRead, writer: BoxedWrite },
}

/// Stdio transport: one session for the lifetime of the process (or of the
/// raw stream pair it was given).
pub struct StdioTransport {
    self_ref: Weak<StdioTransport>,
    session_id: Uuid,
    transport_id: TransportId,
    handler: Arc<dyn FrameHandler>,
    state: StdMutex<TransportState>,
    metrics: AtomicMetrics,
    stream_source: StdMutex<Option<StreamSource>>,
    writer: TokioMutex<Option<FramedWrite<BoxedWrite, LinesCodec>>>,
    reader_task: TokioMutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for StdioTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioTransport")
            .field("session_id", &self.session_id)
            .field("state", &*self.state.lock().expect("state mutex poisoned"))
            .finish()
    }
}

impl StdioTransport {
    /// Communicate over the current process's stdin/stdout.
    pub fn new(handler: Arc<dyn FrameHandler>) -> Arc<Self> {
        Self::build(handler, StreamSource::ProcessStdio)
    }

    /// Communicate over an arbitrary pair of async streams — a spawned
    /// child's piped stdio, or an in-process duplex for tests and
    /// server-in-client embedding.
    pub fn from_raw<R, W>(handler: Arc<dyn FrameHandler>, reader: R, writer: W) -> Arc<Self>
    where
        R: AsyncRead + Send + Sync + 'static,
        W: AsyncWrite + Send + Sync + 'static,
    {
        Self::build(
            handler,
            StreamSource::Raw {
                reader: Box::pin(reader),
                writer: Box::pin(writer),
            },
        )
    }

    fn build(handler: Arc<dyn FrameHandler>, source: StreamSource) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            session_id: Uuid::new_v4(),
            transport_id: TransportId::new(),
            handler,
            state: StdMutex::new(TransportState::Idle),
            metrics: AtomicMetrics::default(),
            stream_source: StdMutex::new(Some(source)),
            writer: TokioMutex::new(None),
            reader_task: TokioMutex::new(None),
        })
    }

    fn set_state(&self, state: TransportState) {
        *self.state.lock().expect("state mutex poisoned") = state;
    }
}

#[async_trait]
impl Transport for StdioTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::Stdio
    }

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities {
            bidirectional: true,
            multi_session: false,
            streaming: false,
        }
    }

    async fn state(&self) -> TransportState {
        *self.state.lock().expect("state mutex poisoned")
    }

    async fn start(&self) -> TransportResult<()> {
        self.set_state(TransportState::Connecting);

        let source = self
            .stream_source
            .lock()
            .expect("stream_source mutex poisoned")
            .take()
            .ok_or_else(|| TransportError::CommunicationError("stdio transport already started".into()))?;

        let (read_half, write_half): (BoxedRead, BoxedWrite) = match source {
            StreamSource::ProcessStdio => (Box::pin(tokio::io::stdin()), Box::pin(tokio::io::stdout())),
            StreamSource::Raw { reader, writer } => (reader, writer),
        };

        let mut reader = FramedRead::new(BufReader::new(read_half), LinesCodec::new());
        *self.writer.lock().await = Some(FramedWrite::new(write_half, LinesCodec::new()));

        let self_arc: Arc<dyn Transport> = self.self_ref.upgrade().expect("transport dropped during start");
        self.handler.session_opened(self.session_id, self.transport_id, self_arc);

        let handler = self.handler.clone();
        let session_id = self.session_id;
        let self_ref = self.self_ref.clone();

        let task = tokio::spawn(async move {
            while let Some(result) = reader.next().await {
                let Some(this) = self_ref.upgrade() else { break };
                match result {
                    Ok(line) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        this.metrics.record_received(line.len());
                        if let Some(reply) = handler.handle_frame(session_id, line.as_bytes()).await {
                            if let Err(err) = this.write_line(&reply).await {
                                warn!(%err, "failed to write stdio reply");
                            }
                        }
                    }
                    Err(err) => {
                        warn!(%err, "stdio read error, closing session");
                        break;
                    }
                }
            }
            if let Some(this) = self_ref.upgrade() {
                this.set_state(TransportState::Disconnected);
                this.handler.session_closed(session_id);
            }
            debug!(%session_id, "stdio reader loop exited");
        });

        *self.reader_task.lock().await = Some(task);
        self.set_state(TransportState::Connected);
        Ok(())
    }

    async fn stop(&self) -> TransportResult<()> {
        self.set_state(TransportState::Disconnecting);
        if let Some(task) = self.reader_task.lock().await.take() {
            task.abort();
        }
        *self.writer.lock().await = None;
        self.handler.session_closed(self.session_id);
        self.set_state(TransportState::Disconnected);
        Ok(())
    }

    async fn send(&self, message: TransportMessage) -> TransportResult<()> {
        self.write_line(&message.payload).await
    }

    fn metrics(&self) -> TransportMetrics {
        self.metrics.snapshot()
    }

    fn endpoint(&self) -> Option<String> {
        Some("stdio://".to_string())
    }
}

impl StdioTransport {
    async fn write_line(&self, bytes: &[u8]) -> TransportResult<()> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| TransportError::CommunicationError(format!("non-utf8 payload: {e}")))?;
        if text.contains('\n') || text.contains('\r') {
            return Err(TransportError::CommunicationError(
                "message contains an embedded newline, which stdio framing forbids".into(),
            ));
        }

        let mut writer = self.writer.lock().await;
        let Some(sink) = writer.as_mut() else {
            return Err(TransportError::NotConnected);
        };
        sink.send(text.to_string())
            .await
            .map_err(|e| TransportError::CommunicationError(e.to_string()))?;
        self.metrics.record_sent(text.len());
        trace!(bytes = text.len(), "wrote stdio frame");
        Ok(())
    }
}

/// Produces [`StdioTransport`] instances — always available, never platform
/// gated (spec.md §4.5: "Process-backed" / "In-process bridge" factories).
#[derive(Debug, Default)]
pub struct StdioTransportFactory;

impl TransportFactory for StdioTransportFactory {
    fn transport_type(&self) -> TransportType {
        TransportType::Stdio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdSyncMutex;

    struct EchoHandler {
        opened: StdSyncMutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl FrameHandler for EchoHandler {
        async fn handle_frame(&self, _session_id: Uuid, bytes: &[u8]) -> Option<Vec<u8>> {
            Some(bytes.to_vec())
        }
        fn session_opened(&self, session_id: Uuid, _transport_id: TransportId, _transport: Arc<dyn Transport>) {
            self.opened.lock().unwrap().push(session_id);
        }
        fn session_closed(&self, _session_id: Uuid) {}
    }

    #[tokio::test]
    async fn start_registers_session_then_echoes_a_line() {
        let (client_write, server_read) = tokio::io::duplex(1024);
        let (server_write, mut client_read) = tokio::io::duplex(1024);

        let handler = Arc::new(EchoHandler {
            opened: StdSyncMutex::new(vec![]),
        });
        let transport = StdioTransport::from_raw(handler.clone(), server_read, server_write);
        transport.start().await.unwrap();
        assert_eq!(handler.opened.lock().unwrap().len(), 1);

        let mut writer = client_write;
        tokio::io::AsyncWriteExt::write_all(&mut writer, b"{\"jsonrpc\":\"2.0\"}\n")
            .await
            .unwrap();

        let mut buf = vec![0u8; 64];
        let n = tokio::io::AsyncReadExt::read(&mut client_read, &mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"{\"jsonrpc\":\"2.0\"}\n");
    }

    #[test]
    fn factory_reports_stdio_type() {
        let factory = StdioTransportFactory;
        assert_eq!(factory.transport_type(), TransportType::Stdio);
        assert!(factory.is_available());
    }
}
