//! `ping` (spec.md §4.9): a liveness check that always succeeds with an
//! empty result.

use protomcp_core::Error;
use serde_json::{Map, Value};

pub fn handle() -> Result<Map<String, Value>, Error> {
    Ok(Map::new())
}
