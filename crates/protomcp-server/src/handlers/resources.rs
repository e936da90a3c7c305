//! `resources/list` and `resources/read` (spec.md §4.9).

use protomcp_core::Error;
use protomcp_types::ResourceMetadata;
use serde_json::{json, Map, Value};

use super::require_str;
use crate::registry::Registry;

pub async fn list<T: 'static>(registry: &Registry) -> Result<Map<String, Value>, Error> {
    let resources: Vec<Value> = registry
        .list_resources::<T>()
        .into_iter()
        .map(resource_to_value)
        .collect();
    Ok(json!({ "resources": resources }).as_object().cloned().unwrap_or_default())
}

pub async fn read<T: 'static>(
    registry: &Registry,
    params: Map<String, Value>,
) -> Result<Map<String, Value>, Error> {
    let uri = require_str(&params, "uri")?;
    let contents = registry.read_resource::<T>(&uri).await?;
    let entry = json!({
        "uri": contents.uri,
        "mimeType": contents.mime_type,
        "text": contents.text,
    });
    Ok(json!({ "contents": [entry] }).as_object().cloned().unwrap_or_default())
}

fn resource_to_value(meta: ResourceMetadata) -> Value {
    let mut obj = Map::new();
    obj.insert("uri".into(), Value::String(meta.uri));
    obj.insert("name".into(), Value::String(meta.name));
    if let Some(desc) = meta.description {
        obj.insert("description".into(), Value::String(desc));
    }
    if let Some(mime) = meta.mime_type {
        obj.insert("mimeType".into(), Value::String(mime));
    }
    Value::Object(obj)
}
