//! Concrete client-side transports: stdio (spawn or in-process pipe), TCP,
//! and HTTP (streamable `/mcp` or legacy `/sse` + `/messages/{id}`),
//! mirroring spec.md §4.5–§4.7 from the consumer's side.
//!
//! Unlike the server-side [`protomcp_transport_traits::Transport`], which
//! pushes frames into a [`protomcp_transport_traits::FrameHandler`], a
//! client transport is pulled from: the protocol layer calls `send` to
//! write a request and polls `receive` for whatever comes back, matching
//! the teacher's client-side `Transport::receive() -> Option<Message>`
//! shape rather than the server's handler-push one.

use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use protomcp_transport_traits::{TransportError, TransportResult};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

/// What a client speaks to move raw JSON-RPC frames across one connection.
/// Concrete transports hide their own framing (newline-delimited, SSE) and
/// hand the protocol layer exactly one decoded frame per `receive` call.
#[async_trait]
pub trait ClientTransport: Send + Sync {
    /// Write one encoded frame (a single message or a batch array).
    async fn send(&self, bytes: &[u8]) -> TransportResult<()>;

    /// Read the next frame, or `None` if the peer closed the connection.
    async fn receive(&self) -> TransportResult<Option<Vec<u8>>>;

    /// Tear the connection down.
    async fn close(&self) -> TransportResult<()>;
}

// ---------------------------------------------------------------------
// Stdio
// ---------------------------------------------------------------------

type BoxedRead = Pin<Box<dyn AsyncRead + Send>>;
type BoxedWrite = Pin<Box<dyn AsyncWrite + Send>>;

/// Configuration for spawning a server as a child process (spec.md §4.5
/// "Process-backed": "spawn a child through a login shell").
#[derive(Debug, Clone)]
pub struct StdioCommandConfig {
    /// The command line to hand to `/bin/sh -lc`.
    pub command: String,
    /// Working directory for the child, if not the current one.
    pub working_directory: Option<PathBuf>,
    /// Extra environment variables to set for the child.
    pub env: Vec<(String, String)>,
}

impl StdioCommandConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            working_directory: None,
            env: Vec::new(),
        }
    }
}

/// Line-delimited JSON over a child process's stdio, or over an arbitrary
/// pair of async streams (spec.md §4.5).
pub struct StdioClientTransport {
    reader: AsyncMutex<FramedRead<BufReader<BoxedRead>, LinesCodec>>,
    writer: AsyncMutex<FramedWrite<BoxedWrite, LinesCodec>>,
    child: Option<AsyncMutex<Child>>,
}

impl StdioClientTransport {
    /// Spawn `config.command` through a login shell and wire its stdio.
    pub fn spawn(config: StdioCommandConfig) -> TransportResult<Self> {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-lc").arg(&config.command);
        if let Some(dir) = &config.working_directory {
            cmd.current_dir(dir);
        }
        for (key, value) in &config.env {
            cmd.env(key, value);
        }
        cmd.stdin(std::process::Stdio::piped());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::inherit());

        let mut child = cmd
            .spawn()
            .map_err(|e| TransportError::CommunicationError(format!("failed to spawn child: {e}")))?;

        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");

        Ok(Self::from_raw_with_child(stdout, stdin, Some(child)))
    }

    /// Wire an arbitrary pair of async streams — an in-process duplex for
    /// tests, or running the server embedded in the same process as the
    /// client (spec.md §4.5 "In-process bridge").
    pub fn from_raw<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + 'static,
        W: AsyncWrite + Send + 'static,
    {
        Self::from_raw_with_child(reader, writer, None)
    }

    fn from_raw_with_child<R, W>(reader: R, writer: W, child: Option<Child>) -> Self
    where
        R: AsyncRead + Send + 'static,
        W: AsyncWrite + Send + 'static,
    {
        let boxed_read: BoxedRead = Box::pin(reader);
        let boxed_write: BoxedWrite = Box::pin(writer);
        Self {
            reader: AsyncMutex::new(FramedRead::new(BufReader::new(boxed_read), LinesCodec::new())),
            writer: AsyncMutex::new(FramedWrite::new(boxed_write, LinesCodec::new())),
            child: child.map(AsyncMutex::new),
        }
    }
}

#[async_trait]
impl ClientTransport for StdioClientTransport {
    async fn send(&self, bytes: &[u8]) -> TransportResult<()> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| TransportError::CommunicationError(format!("non-utf8 payload: {e}")))?;
        let mut writer = self.writer.lock().await;
        writer
            .send(text.to_string())
            .await
            .map_err(|e| TransportError::CommunicationError(e.to_string()))
    }

    async fn receive(&self) -> TransportResult<Option<Vec<u8>>> {
        let mut reader = self.reader.lock().await;
        loop {
            match reader.next().await {
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    return Ok(Some(line.into_bytes()));
                }
                Some(Err(e)) => return Err(TransportError::CommunicationError(e.to_string())),
                None => return Ok(None),
            }
        }
    }

    async fn close(&self) -> TransportResult<()> {
        if let Some(child) = &self.child {
            let mut child = child.lock().await;
            let _ = child.start_kill();
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------
// TCP
// ---------------------------------------------------------------------

/// Line-delimited JSON over a plain TCP socket (spec.md §4.6, client side).
pub struct TcpClientTransport {
    reader: AsyncMutex<FramedRead<BufReader<tokio::net::tcp::OwnedReadHalf>, LinesCodec>>,
    writer: AsyncMutex<FramedWrite<tokio::net::tcp::OwnedWriteHalf, LinesCodec>>,
}

impl TcpClientTransport {
    /// Connect directly to `host:port`.
    pub async fn connect(host: &str, port: u16) -> TransportResult<Self> {
        let stream = tokio::net::TcpStream::connect((host, port))
            .await
            .map_err(|e| TransportError::CommunicationError(format!("TCP connect failed: {e}")))?;
        Ok(Self::from_stream(stream))
    }

    /// Resolve a `_mcp._tcp` Bonjour peer and connect to its first
    /// advertised address (spec.md §4.6: "Discovery from the client side
    /// uses a DNS-SD browse").
    pub async fn discover_and_connect(
        service_type: &str,
        instance_filter: Option<&str>,
        prefer_ipv4: bool,
        timeout: std::time::Duration,
    ) -> TransportResult<Self> {
        let found = protomcp_tcp::discovery::browse(service_type, instance_filter, timeout).await?;
        let service = found
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::CommunicationError("no mDNS peers found".into()))?;

        let address = service
            .addresses
            .iter()
            .find(|addr| !prefer_ipv4 || addr.is_ipv4())
            .or_else(|| service.addresses.first())
            .ok_or_else(|| TransportError::CommunicationError("discovered service has no addresses".into()))?;

        Self::connect(&address.to_string(), service.port).await
    }

    fn from_stream(stream: tokio::net::TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: AsyncMutex::new(FramedRead::new(BufReader::new(read_half), LinesCodec::new())),
            writer: AsyncMutex::new(FramedWrite::new(write_half, LinesCodec::new())),
        }
    }
}

#[async_trait]
impl ClientTransport for TcpClientTransport {
    async fn send(&self, bytes: &[u8]) -> TransportResult<()> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| TransportError::CommunicationError(format!("non-utf8 payload: {e}")))?;
        let mut writer = self.writer.lock().await;
        writer
            .send(text.to_string())
            .await
            .map_err(|e| TransportError::CommunicationError(e.to_string()))
    }

    async fn receive(&self) -> TransportResult<Option<Vec<u8>>> {
        let mut reader = self.reader.lock().await;
        loop {
            match reader.next().await {
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    return Ok(Some(line.into_bytes()));
                }
                Some(Err(e)) => return Err(TransportError::CommunicationError(e.to_string())),
                None => return Ok(None),
            }
        }
    }

    async fn close(&self) -> TransportResult<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------
// HTTP (streamable + legacy SSE)
// ---------------------------------------------------------------------

mod http;
pub use http::HttpClientTransport;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stdio_raw_round_trips_a_line() {
        let (client_write, server_read) = tokio::io::duplex(1024);
        let (server_write, client_read) = tokio::io::duplex(1024);

        let client = StdioClientTransport::from_raw(client_read, client_write);
        client.send(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).await.unwrap();

        let mut server_reader = FramedRead::new(BufReader::new(server_read), LinesCodec::new());
        let line = server_reader.next().await.unwrap().unwrap();
        assert_eq!(line, r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);

        let mut server_writer = FramedWrite::new(server_write, LinesCodec::new());
        server_writer.send(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#.to_string()).await.unwrap();
        let received = client.receive().await.unwrap().unwrap();
        assert_eq!(received, br#"{"jsonrpc":"2.0","id":1,"result":{}}"#);
    }

    #[tokio::test]
    async fn stdio_receive_returns_none_when_peer_closes() {
        let (client_write, server_read) = tokio::io::duplex(1024);
        let (server_write, client_read) = tokio::io::duplex(1024);
        drop(server_read);
        drop(server_write);
        drop(client_write);

        let client = StdioClientTransport::from_raw(client_read, tokio::io::sink());
        let received = client.receive().await.unwrap();
        assert!(received.is_none());
    }
}
