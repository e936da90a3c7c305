//! Method handlers for the dispatch table (spec.md §4.9). Each module
//! implements the small slice of the method table its name suggests; none
//! of them know about framing, batching, or session bookkeeping — that
//! lives in [`crate::dispatch`].

pub mod completion;
pub mod initialize;
pub mod logging;
pub mod ping;
pub mod prompts;
pub mod resources;
pub mod tools;

use protomcp_core::Error;
use serde_json::{Map, Value};

/// Pull a required string field out of a params object.
pub(crate) fn require_str(params: &Map<String, Value>, key: &str) -> Result<String, Error> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::invalid_params(format!("missing or non-string `{key}`")))
}

/// Pull an optional object field out of a params object, defaulting empty.
pub(crate) fn object_field(params: &Map<String, Value>, key: &str) -> Map<String, Value> {
    params.get(key).and_then(Value::as_object).cloned().unwrap_or_default()
}
