//! Bonjour/DNS-SD advertisement and browsing (spec.md §4.6: `_mcp._tcp` on
//! `local.`).

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tracing::{debug, warn};

use protomcp_transport_traits::{TransportError, TransportResult};

/// Default Bonjour service type this transport advertises and browses.
pub const DEFAULT_SERVICE_TYPE: &str = "_mcp._tcp.local.";

/// A running mDNS responder plus the fully-qualified name it registered,
/// needed to unregister cleanly on shutdown.
pub struct Advertisement {
    daemon: ServiceDaemon,
    fullname: String,
}

impl Advertisement {
    /// Advertise `service_name` (an instance name, not the service type) on
    /// `port`, under `service_type` (defaults to [`DEFAULT_SERVICE_TYPE`]).
    pub fn start(service_type: &str, instance_name: &str, port: u16) -> TransportResult<Self> {
        let daemon = ServiceDaemon::new()
            .map_err(|e| TransportError::BindingFailed(format!("mDNS daemon init failed: {e}")))?;

        let host_name = format!("{}.local.", hostname());
        let info = ServiceInfo::new(
            service_type,
            instance_name,
            &host_name,
            "",
            port,
            &[][..],
        )
        .map_err(|e| TransportError::BindingFailed(format!("invalid mDNS service record: {e}")))?
        .enable_addr_auto();

        let fullname = info.get_fullname().to_string();
        daemon
            .register(info)
            .map_err(|e| TransportError::BindingFailed(format!("mDNS registration failed: {e}")))?;

        debug!(%fullname, port, "advertising MCP service via mDNS");
        Ok(Self { daemon, fullname })
    }

    pub fn stop(self) {
        if let Err(e) = self.daemon.unregister(&self.fullname) {
            warn!(error = %e, "failed to unregister mDNS service");
        }
        if let Err(e) = self.daemon.shutdown() {
            warn!(error = %e, "failed to shut down mDNS daemon");
        }
    }
}

/// One browse result: an advertised `_mcp._tcp` peer.
#[derive(Debug, Clone)]
pub struct DiscoveredService {
    pub instance_name: String,
    pub host: String,
    pub port: u16,
    pub addresses: Vec<std::net::IpAddr>,
}

/// Browse for peers advertising `service_type`, case-insensitively matching
/// `instance_filter` against the instance name when given, for up to
/// `timeout`.
pub async fn browse(
    service_type: &str,
    instance_filter: Option<&str>,
    timeout: std::time::Duration,
) -> TransportResult<Vec<DiscoveredService>> {
    let daemon = ServiceDaemon::new()
        .map_err(|e| TransportError::CommunicationError(format!("mDNS daemon init failed: {e}")))?;
    let receiver = daemon
        .browse(service_type)
        .map_err(|e| TransportError::CommunicationError(format!("mDNS browse failed: {e}")))?;

    let mut found = Vec::new();
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        let event = match tokio::time::timeout(remaining, receiver.recv_async()).await {
            Ok(Ok(event)) => event,
            _ => break,
        };
        if let ServiceEvent::ServiceResolved(info) = event {
            let matches = instance_filter
                .map(|filter| info.get_fullname().to_lowercase().contains(&filter.to_lowercase()))
                .unwrap_or(true);
            if matches {
                found.push(DiscoveredService {
                    instance_name: info.get_fullname().to_string(),
                    host: info.get_hostname().to_string(),
                    port: info.get_port(),
                    addresses: info.get_addresses().iter().copied().collect(),
                });
            }
        }
    }

    let _ = daemon.shutdown();
    Ok(found)
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "protomcp-host".to_string())
}
