//! `initialize` (spec.md §4.9): capability exchange, the one handshake
//! every other method requires to have completed first.

use protomcp_core::Error;
use protomcp_types::{ClientCapabilities, ClientInfo, ServerCapabilities, ServerInfo, PROTOCOL_VERSION};
use serde_json::{json, Map, Value};

use crate::session::Session;

pub fn handle(
    session: &Session,
    params: Map<String, Value>,
    server_info: &ServerInfo,
    capabilities: &ServerCapabilities,
) -> Result<Map<String, Value>, Error> {
    let client_info: ClientInfo = params
        .get("clientInfo")
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| Error::invalid_params(format!("invalid clientInfo: {e}")))?
        .ok_or_else(|| Error::invalid_params("missing clientInfo"))?;

    let client_capabilities: ClientCapabilities = params
        .get("capabilities")
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| Error::invalid_params(format!("invalid capabilities: {e}")))?
        .unwrap_or_default();

    session.mark_initialized(client_info, client_capabilities);

    let result = json!({
        "protocolVersion": PROTOCOL_VERSION,
        "serverInfo": server_info,
        "capabilities": capabilities,
    });
    Ok(result.as_object().cloned().unwrap_or_default())
}
