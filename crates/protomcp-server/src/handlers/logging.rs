//! `logging/setLevel` (spec.md §4.9): the client's minimum severity for
//! `notifications/message` going forward.

use protomcp_core::Error;
use protomcp_types::LogLevel;
use serde_json::{Map, Value};

use crate::session::Session;

pub fn set_level(session: &Session, params: Map<String, Value>) -> Result<Map<String, Value>, Error> {
    let level_name = params
        .get("level")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::invalid_params("missing or non-string `level`"))?;
    let level = LogLevel::parse(level_name)
        .ok_or_else(|| Error::invalid_params(format!("unknown log level `{level_name}`")))?;
    session.set_minimum_log_level(level);
    Ok(Map::new())
}
