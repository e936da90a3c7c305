//! `tools/list` and `tools/call` (spec.md §4.9, §4.2).

use protomcp_core::Error;
use protomcp_types::ToolMetadata;
use serde_json::{json, Map, Value};

use super::{object_field, require_str};
use crate::registry::Registry;

pub async fn list<T: 'static>(registry: &Registry) -> Result<Map<String, Value>, Error> {
    let tools: Vec<Value> = registry
        .list_tools::<T>()
        .into_iter()
        .map(tool_to_value)
        .collect();
    Ok(json!({ "tools": tools }).as_object().cloned().unwrap_or_default())
}

pub async fn call<T: 'static>(
    registry: &Registry,
    params: Map<String, Value>,
) -> Result<Map<String, Value>, Error> {
    let name = require_str(&params, "name")?;
    let arguments = object_field(&params, "arguments");

    let result = registry.call_tool::<T>(&name, arguments).await;
    // Tool/domain failures surface as `isError: true` content, not a
    // JSON-RPC error (spec.md §7) — but an unknown-tool lookup failure is
    // still a protocol-level error since the client asked for a name the
    // server never advertised.
    match result {
        Ok(call_result) => {
            let content: Vec<Value> = call_result
                .content
                .iter()
                .map(|c| serde_json::to_value(c).unwrap_or(Value::Null))
                .collect();
            Ok(json!({ "content": content, "isError": call_result.is_error })
                .as_object()
                .cloned()
                .unwrap_or_default())
        }
        Err(err @ Error::Tool(protomcp_core::ToolError::UnknownTool(_))) => Err(err),
        Err(Error::Tool(tool_err)) => Ok(json!({
            "content": [{"type": "text", "text": tool_err.to_string()}],
            "isError": true,
        })
        .as_object()
        .cloned()
        .unwrap_or_default()),
        Err(other) => Err(other),
    }
}

fn tool_to_value(meta: ToolMetadata) -> Value {
    let mut obj = Map::new();
    obj.insert("name".into(), Value::String(meta.name));
    if let Some(desc) = meta.description {
        obj.insert("description".into(), Value::String(desc));
    }
    obj.insert(
        "inputSchema".into(),
        serde_json::to_value(&meta.input_schema).unwrap_or(Value::Null),
    );
    if let Some(output) = meta.output_schema {
        obj.insert("outputSchema".into(), serde_json::to_value(&output).unwrap_or(Value::Null));
    }
    if let Some(annotations) = meta.annotations {
        obj.insert("annotations".into(), serde_json::to_value(&annotations).unwrap_or(Value::Null));
    }
    Value::Object(obj)
}
