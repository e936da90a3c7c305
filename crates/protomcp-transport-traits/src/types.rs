//! Transport identity, lifecycle state, capability flags, and config.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which concrete transport this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    Stdio,
    Tcp,
    Http,
}

/// Lifecycle state of a transport or connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Idle,
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
}

/// Static capability flags a transport can advertise.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportCapabilities {
    /// Can this transport carry a server→client request (not just replies)?
    pub bidirectional: bool,
    /// Can this transport hold more than one concurrent session?
    pub multi_session: bool,
    /// Does this transport support a streaming (push) channel, e.g. SSE?
    pub streaming: bool,
}

/// Generic knobs shared by all transports; concrete transports narrow these
/// further with their own `*Config` struct (spec.md's "[AMBIENT] Configuration").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(with = "duration_millis")]
    pub read_timeout: Duration,
    pub max_frame_bytes: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(30),
            max_frame_bytes: 16 * 1024 * 1024,
        }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
