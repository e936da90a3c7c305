//! HTTP client transport: Streamable HTTP (`POST`/`GET /mcp`) and legacy
//! HTTP+SSE (`GET /sse` + `POST /messages/{id}`), per spec.md §4.7 from the
//! consumer's side.

use std::sync::Mutex as StdMutex;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client as HttpClient;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::warn;

use protomcp_transport_traits::{TransportError, TransportResult};

use super::ClientTransport;

/// Legacy SSE requires the `endpoint` event within this long, or the
/// bootstrap fails (spec.md §5: "legacy SSE client waits up to 10s").
const ENDPOINT_EVENT_TIMEOUT: Duration = Duration::from_secs(10);

enum Mode {
    /// Single `/mcp` endpoint; `Mcp-Session-Id` carries the session once the
    /// first `POST` response supplies one.
    Streamable,
    /// A `POST` target discovered from the `endpoint` SSE event, fixed for
    /// the life of the connection.
    Legacy { post_url: String },
}

/// HTTP transport for the MCP client proxy. Holds one `reqwest::Client`,
/// optionally an open `GET` SSE stream pumping inbound frames into an
/// internal channel, and (streamable mode) the `Mcp-Session-Id` the server
/// assigned.
pub struct HttpClientTransport {
    http: HttpClient,
    base_url: String,
    mode: Mode,
    session_id: StdMutex<Option<String>>,
    inbox_tx: mpsc::UnboundedSender<Vec<u8>>,
    inbox_rx: AsyncMutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    stream_task: AsyncMutex<Option<JoinHandle<()>>>,
}

impl HttpClientTransport {
    /// Connect using the Streamable HTTP variant: a single `POST`/`GET
    /// /mcp` endpoint (spec.md §4.7 "Streamable HTTP").
    pub fn connect_streamable(base_url: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            http: HttpClient::new(),
            base_url: base_url.into(),
            mode: Mode::Streamable,
            session_id: StdMutex::new(None),
            inbox_tx: tx,
            inbox_rx: AsyncMutex::new(rx),
            stream_task: AsyncMutex::new(None),
        }
    }

    /// Connect using the legacy HTTP+SSE variant: open `GET /sse`, wait for
    /// the `endpoint` event, and POST subsequent requests there (spec.md
    /// §4.7 "Legacy HTTP+SSE", §8 scenario 4).
    pub async fn connect_legacy(base_url: impl Into<String>) -> TransportResult<Self> {
        let base_url = base_url.into();
        let http = HttpClient::new();
        let (tx, rx) = mpsc::unbounded_channel();

        let response = http
            .get(format!("{base_url}/sse"))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| TransportError::CommunicationError(format!("GET /sse failed: {e}")))?;

        if !response.status().is_success() {
            return Err(TransportError::CommunicationError(format!(
                "GET /sse returned {}",
                response.status()
            )));
        }

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let post_url = tokio::time::timeout(ENDPOINT_EVENT_TIMEOUT, async {
            loop {
                let Some(chunk) = stream.next().await else {
                    return Err(TransportError::CommunicationError(
                        "SSE stream closed before endpoint event".into(),
                    ));
                };
                let chunk = chunk.map_err(|e| TransportError::CommunicationError(e.to_string()))?;
                buffer.push_str(&String::from_utf8_lossy(&chunk));
                if let Some((event, rest)) = split_next_event(&buffer) {
                    buffer = rest;
                    if event.name.as_deref() == Some("endpoint") {
                        return Ok(event.data);
                    }
                }
            }
        })
        .await
        .map_err(|_| TransportError::CommunicationError("timed out waiting for endpoint event".into()))??;

        let transport = Self {
            http,
            base_url,
            mode: Mode::Legacy { post_url },
            session_id: StdMutex::new(None),
            inbox_tx: tx,
            inbox_rx: AsyncMutex::new(rx),
            stream_task: AsyncMutex::new(None),
        };

        // The bootstrap GET is the client's only read channel for legacy
        // SSE; keep draining it for the rest of the connection's life.
        transport.spawn_event_pump(stream, buffer);
        Ok(transport)
    }

    fn spawn_event_pump(
        &self,
        mut stream: impl futures::Stream<Item = reqwest::Result<bytes::Bytes>> + Send + Unpin + 'static,
        mut buffer: String,
    ) {
        let tx = self.inbox_tx.clone();
        let task = tokio::spawn(async move {
            loop {
                match stream.next().await {
                    Some(Ok(chunk)) => {
                        buffer.push_str(&String::from_utf8_lossy(&chunk));
                        while let Some((event, rest)) = split_next_event(&buffer) {
                            buffer = rest;
                            if event.data.is_empty() {
                                continue;
                            }
                            if tx.send(event.data.into_bytes()).is_err() {
                                return;
                            }
                        }
                    }
                    Some(Err(err)) => {
                        warn!(%err, "SSE stream read error");
                        return;
                    }
                    None => return,
                }
            }
        });
        // Only one pump task should ever run per transport.
        if let Ok(mut guard) = self.stream_task.try_lock() {
            *guard = Some(task);
        }
    }

    async fn ensure_stream_open(&self) {
        let mut guard = self.stream_task.lock().await;
        if guard.is_some() {
            return;
        }
        let Mode::Streamable = &self.mode else { return };
        let Some(session_id) = self.session_id.lock().unwrap().clone() else {
            return;
        };

        let response = match self
            .http
            .get(format!("{}/mcp", self.base_url))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .header("mcp-session-id", &session_id)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!(status = %response.status(), "GET /mcp stream rejected");
                return;
            }
            Err(err) => {
                warn!(%err, "failed to open GET /mcp stream");
                return;
            }
        };

        let stream = response.bytes_stream();
        let tx = self.inbox_tx.clone();
        let task = tokio::spawn(async move {
            let mut stream = stream;
            let mut buffer = String::new();
            loop {
                match stream.next().await {
                    Some(Ok(chunk)) => {
                        buffer.push_str(&String::from_utf8_lossy(&chunk));
                        while let Some((event, rest)) = split_next_event(&buffer) {
                            buffer = rest;
                            if event.data.is_empty() {
                                continue;
                            }
                            if tx.send(event.data.into_bytes()).is_err() {
                                return;
                            }
                        }
                    }
                    Some(Err(err)) => {
                        warn!(%err, "SSE stream read error");
                        return;
                    }
                    None => return,
                }
            }
        });
        *guard = Some(task);
    }
}

#[async_trait::async_trait]
impl ClientTransport for HttpClientTransport {
    async fn send(&self, bytes: &[u8]) -> TransportResult<()> {
        let url = match &self.mode {
            Mode::Streamable => format!("{}/mcp", self.base_url),
            Mode::Legacy { post_url } => post_url.clone(),
        };

        let mut request = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, "application/json")
            .body(bytes.to_vec());

        if let Mode::Streamable = &self.mode {
            if let Some(session_id) = self.session_id.lock().unwrap().clone() {
                request = request.header("mcp-session-id", session_id);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::CommunicationError(format!("POST failed: {e}")))?;

        if let Some(session_id) = response
            .headers()
            .get("mcp-session-id")
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.lock().unwrap() = Some(session_id.to_string());
        }

        let status = response.status();
        if status == reqwest::StatusCode::ACCEPTED {
            // Legacy: the reply will arrive on the already-open SSE stream.
            // Streamable: the reply will arrive once a GET /mcp stream is
            // attached — open one now if it isn't already.
            self.ensure_stream_open().await;
            return Ok(());
        }
        if !status.is_success() {
            return Err(TransportError::CommunicationError(format!("POST returned {status}")));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::CommunicationError(format!("failed to read response body: {e}")))?;

        if !body.is_empty() && content_type.contains("application/json") {
            let _ = self.inbox_tx.send(body.to_vec());
        }
        Ok(())
    }

    async fn receive(&self) -> TransportResult<Option<Vec<u8>>> {
        let mut rx = self.inbox_rx.lock().await;
        Ok(rx.recv().await)
    }

    async fn close(&self) -> TransportResult<()> {
        if let Some(task) = self.stream_task.lock().await.take() {
            task.abort();
        }
        Ok(())
    }
}

struct SseEvent {
    name: Option<String>,
    data: String,
}

/// Pull the next complete `\n\n`-terminated SSE event out of `buffer`,
/// returning it and the remainder, or `None` if `buffer` holds no complete
/// event yet (spec.md §6: `event: NAME\n` (optional) `data: PAYLOAD\n\n`).
fn split_next_event(buffer: &str) -> Option<(SseEvent, String)> {
    let idx = buffer.find("\n\n")?;
    let (raw_event, rest) = buffer.split_at(idx);
    let rest = rest[2..].to_string();

    let mut name = None;
    let mut data_lines = Vec::new();
    for line in raw_event.lines() {
        if let Some(value) = line.strip_prefix("event:") {
            name = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.trim_start().to_string());
        }
        // Comment lines (leading `:`) carry no payload and are skipped.
    }

    Some((
        SseEvent {
            name,
            data: data_lines.join("\n"),
        },
        rest,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_a_named_event() {
        let buffer = "event: endpoint\ndata: http://host/messages/abc\n\nrest";
        let (event, rest) = split_next_event(buffer).unwrap();
        assert_eq!(event.name.as_deref(), Some("endpoint"));
        assert_eq!(event.data, "http://host/messages/abc");
        assert_eq!(rest, "rest");
    }

    #[test]
    fn splits_an_unnamed_event() {
        let buffer = "data: {}\n\n";
        let (event, rest) = split_next_event(buffer).unwrap();
        assert!(event.name.is_none());
        assert_eq!(event.data, "{}");
        assert_eq!(rest, "");
    }

    #[test]
    fn returns_none_without_a_complete_event() {
        assert!(split_next_event("data: partial").is_none());
    }
}
