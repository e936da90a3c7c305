//! [`TcpTransport`]: newline-delimited JSON over a TCP listener, one
//! session per accepted connection, with optional Bonjour advertisement.
//!
//! Follows the same interior-mutability split as `protomcp-stdio`:
//! `std::sync::Mutex` for cold lifecycle state, `AtomicMetrics` for hot
//! counters, and a `DashMap` of per-connection outbound senders instead of
//! the teacher's `Mutex<HashMap<SocketAddr, Sender>>` — sends and accepts
//! contend on different connections far more often than they collide, so a
//! sharded map avoids one lock serializing the whole listener.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};

use async_trait::async_trait;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info, warn};
use uuid::Uuid;

use protomcp_transport_traits::{
    AtomicMetrics, FrameHandler, Transport, TransportCapabilities, TransportError, TransportFactory,
    TransportId, TransportMessage, TransportMetrics, TransportResult, TransportState, TransportType,
};

use crate::discovery::{Advertisement, DEFAULT_SERVICE_TYPE};

const OUTBOUND_CHANNEL_CAPACITY: usize = 64;

/// One TCP listener, fanning accepted connections out to independent
/// sessions. `bind_addr`'s port is resolved at bind time (port 0 picks an
/// ephemeral port), so `endpoint()` only reports a real address once
/// `start()` has run.
pub struct TcpTransport {
    self_ref: Weak<TcpTransport>,
    transport_id: TransportId,
    handler: Arc<dyn FrameHandler>,
    bind_addr: SocketAddr,
    bonjour_name: Option<String>,
    state: StdMutex<TransportState>,
    local_addr: StdMutex<Option<SocketAddr>>,
    metrics: AtomicMetrics,
    connections: DashMap<Uuid, mpsc::Sender<String>>,
    connection_count: AtomicU32,
    accept_task: StdMutex<Option<JoinHandle<()>>>,
    advertisement: StdMutex<Option<Advertisement>>,
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("bind_addr", &self.bind_addr)
            .field("state", &*self.state.lock().expect("state mutex poisoned"))
            .field("connections", &self.connections.len())
            .finish()
    }
}

impl TcpTransport {
    /// Listen on `bind_addr`. When `bonjour_name` is `Some`, the listener
    /// also advertises itself under `_mcp._tcp.local.` once bound
    /// (spec.md §4.6).
    pub fn new(handler: Arc<dyn FrameHandler>, bind_addr: SocketAddr, bonjour_name: Option<String>) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            transport_id: TransportId::new(),
            handler,
            bind_addr,
            bonjour_name,
            state: StdMutex::new(TransportState::Idle),
            local_addr: StdMutex::new(None),
            metrics: AtomicMetrics::default(),
            connections: DashMap::new(),
            connection_count: AtomicU32::new(0),
            accept_task: StdMutex::new(None),
            advertisement: StdMutex::new(None),
        })
    }

    fn set_state(&self, state: TransportState) {
        *self.state.lock().expect("state mutex poisoned") = state;
    }

    fn handle_connection(self_ref: Weak<TcpTransport>, stream: TcpStream, peer: SocketAddr) {
        let session_id = Uuid::new_v4();
        tokio::spawn(async move {
            let Some(this) = self_ref.upgrade() else { return };
            let (mut sink, mut stream) = Framed::new(stream, LinesCodec::new()).split();
            let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_CHANNEL_CAPACITY);
            this.connections.insert(session_id, tx);
            this.connection_count.fetch_add(1, Ordering::Relaxed);

            let self_arc: Arc<dyn Transport> = self_ref.upgrade().expect("transport dropped mid-accept");
            this.handler.session_opened(session_id, this.transport_id, self_arc);
            info!(%session_id, %peer, "tcp session opened");

            let writer_task = tokio::spawn(async move {
                while let Some(line) = rx.recv().await {
                    if let Err(err) = sink.send(line).await {
                        warn!(%err, "tcp write failed, closing connection");
                        break;
                    }
                }
            });

            while let Some(result) = stream.next().await {
                match result {
                    Ok(line) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        this.metrics.record_received(line.len());
                        if let Some(reply) = this.handler.handle_frame(session_id, line.as_bytes()).await {
                            let Some(sender) = this.connections.get(&session_id) else { break };
                            let text = match std::str::from_utf8(&reply) {
                                Ok(t) => t.to_string(),
                                Err(err) => {
                                    warn!(%err, "reply was not valid utf8, dropping");
                                    continue;
                                }
                            };
                            this.metrics.record_sent(text.len());
                            if sender.try_send(text).is_err() {
                                warn!(%session_id, "outbound channel full or closed, dropping reply");
                            }
                        }
                    }
                    Err(err) => {
                        warn!(%err, %session_id, "tcp read error, closing session");
                        break;
                    }
                }
            }

            this.connections.remove(&session_id);
            this.connection_count.fetch_sub(1, Ordering::Relaxed);
            writer_task.abort();
            this.handler.session_closed(session_id);
            debug!(%session_id, "tcp session closed");
        });
    }
}

#[async_trait]
impl Transport for TcpTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::Tcp
    }

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities {
            bidirectional: true,
            multi_session: true,
            streaming: false,
        }
    }

    async fn state(&self) -> TransportState {
        *self.state.lock().expect("state mutex poisoned")
    }

    async fn start(&self) -> TransportResult<()> {
        self.set_state(TransportState::Connecting);

        let listener = TcpListener::bind(self.bind_addr)
            .await
            .map_err(|e| TransportError::BindingFailed(e.to_string()))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| TransportError::BindingFailed(e.to_string()))?;
        *self.local_addr.lock().expect("local_addr mutex poisoned") = Some(local_addr);

        if let Some(name) = &self.bonjour_name {
            match Advertisement::start(DEFAULT_SERVICE_TYPE, name, local_addr.port()) {
                Ok(advertisement) => {
                    *self.advertisement.lock().expect("advertisement mutex poisoned") = Some(advertisement);
                }
                Err(err) => warn!(%err, "mDNS advertisement failed, continuing without discovery"),
            }
        }

        let self_ref = self.self_ref.clone();
        let task = tokio::spawn(async move {
            loop {
                let Some(this) = self_ref.upgrade() else { break };
                match listener.accept().await {
                    Ok((stream, peer)) => TcpTransport::handle_connection(self_ref.clone(), stream, peer),
                    Err(err) => {
                        this.metrics.record_error();
                        warn!(%err, "tcp accept failed");
                        break;
                    }
                }
            }
        });

        *self.accept_task.lock().expect("accept_task mutex poisoned") = Some(task);
        self.set_state(TransportState::Connected);
        info!(%local_addr, "tcp transport listening");
        Ok(())
    }

    async fn stop(&self) -> TransportResult<()> {
        self.set_state(TransportState::Disconnecting);
        if let Some(task) = self.accept_task.lock().expect("accept_task mutex poisoned").take() {
            task.abort();
        }
        if let Some(advertisement) = self.advertisement.lock().expect("advertisement mutex poisoned").take() {
            advertisement.stop();
        }
        for entry in self.connections.iter() {
            let session_id = *entry.key();
            self.handler.session_closed(session_id);
        }
        self.connections.clear();
        self.set_state(TransportState::Disconnected);
        Ok(())
    }

    async fn send(&self, message: TransportMessage) -> TransportResult<()> {
        let sender = self
            .connections
            .get(&message.session_id)
            .ok_or(TransportError::NotConnected)?
            .clone();
        let text = std::str::from_utf8(&message.payload)
            .map_err(|e| TransportError::CommunicationError(format!("non-utf8 payload: {e}")))?
            .to_string();
        sender
            .send(text.clone())
            .await
            .map_err(|_| TransportError::ConnectionClosed)?;
        self.metrics.record_sent(text.len());
        Ok(())
    }

    fn metrics(&self) -> TransportMetrics {
        self.metrics.snapshot()
    }

    fn endpoint(&self) -> Option<String> {
        self.local_addr
            .lock()
            .expect("local_addr mutex poisoned")
            .map(|addr| format!("tcp://{addr}"))
    }
}

/// Produces [`TcpTransport`] instances from configuration.
#[derive(Debug, Default)]
pub struct TcpTransportFactory;

impl TransportFactory for TcpTransportFactory {
    fn transport_type(&self) -> TransportType {
        TransportType::Tcp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdSyncMutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

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
    async fn accepts_a_connection_and_echoes_a_line() {
        let handler = Arc::new(EchoHandler {
            opened: StdSyncMutex::new(vec![]),
        });
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let transport = TcpTransport::new(handler.clone(), addr, None);
        transport.start().await.unwrap();
        let endpoint = transport.endpoint().unwrap();
        let addr_str = endpoint.trim_start_matches("tcp://");

        let mut client = TcpStream::connect(addr_str).await.unwrap();
        client.write_all(b"{\"jsonrpc\":\"2.0\"}\n").await.unwrap();

        let mut buf = vec![0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"{\"jsonrpc\":\"2.0\"}\n");
    }

    #[test]
    fn factory_reports_tcp_type() {
        let factory = TcpTransportFactory;
        assert_eq!(factory.transport_type(), TransportType::Tcp);
        assert!(factory.is_available());
    }
}
