//! `prompts/list` and `prompts/get` (spec.md §4.9).

use protomcp_core::Error;
use protomcp_types::PromptMetadata;
use serde_json::{json, Map, Value};

use super::{object_field, require_str};
use crate::registry::Registry;

pub async fn list<T: 'static>(registry: &Registry) -> Result<Map<String, Value>, Error> {
    let prompts: Vec<Value> = registry
        .list_prompts::<T>()
        .into_iter()
        .map(prompt_to_value)
        .collect();
    Ok(json!({ "prompts": prompts }).as_object().cloned().unwrap_or_default())
}

pub async fn get<T: 'static>(
    registry: &Registry,
    params: Map<String, Value>,
) -> Result<Map<String, Value>, Error> {
    let name = require_str(&params, "name")?;
    let arguments = object_field(&params, "arguments");
    let contents = registry.get_prompt::<T>(&name, arguments).await?;

    let mut result = Map::new();
    if let Some(desc) = contents.description {
        result.insert("description".into(), Value::String(desc));
    }
    let messages: Vec<Value> = contents
        .messages
        .iter()
        .map(|m| serde_json::to_value(m).unwrap_or(Value::Null))
        .collect();
    result.insert("messages".into(), Value::Array(messages));
    Ok(result)
}

fn prompt_to_value(meta: PromptMetadata) -> Value {
    let mut obj = Map::new();
    obj.insert("name".into(), Value::String(meta.name));
    if let Some(desc) = meta.description {
        obj.insert("description".into(), Value::String(desc));
    }
    Value::Object(obj)
}
