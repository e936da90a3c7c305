//! `completion/complete` (spec.md §4.9): argument autocompletion for a
//! prompt or resource template's declared parameters. Only enum-valued
//! parameters produce suggestions; anything else returns an empty list
//! rather than guessing.

use protomcp_core::Error;
use protomcp_types::Schema;
use serde_json::{json, Map, Value};

use crate::registry::Registry;

pub async fn complete<T: 'static>(
    registry: &Registry,
    params: Map<String, Value>,
) -> Result<Map<String, Value>, Error> {
    let reference = params
        .get("ref")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::invalid_params("missing `ref`"))?;
    let ref_type = reference
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::invalid_params("`ref.type` must be a string"))?;
    let ref_name = reference
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::invalid_params("`ref.name` must be a string"))?;

    let argument = params
        .get("argument")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::invalid_params("missing `argument`"))?;
    let arg_name = argument
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::invalid_params("`argument.name` must be a string"))?;
    let prefix = argument.get("value").and_then(Value::as_str).unwrap_or("");

    let schema = match ref_type {
        "ref/prompt" => registry
            .list_prompts::<T>()
            .into_iter()
            .find(|p| p.name == ref_name)
            .and_then(|p| property_schema(&p.input_schema, arg_name)),
        "ref/resource" => registry
            .list_resources::<T>()
            .into_iter()
            .find(|r| r.name == ref_name)
            .and_then(|r| property_schema(&r.input_schema, arg_name)),
        other => {
            return Err(Error::invalid_params(format!("unknown ref type `{other}`")));
        }
    };

    let values: Vec<String> = match schema {
        Some(Schema::Enum { values, .. }) => values
            .iter()
            .filter_map(Value::as_str)
            .filter(|v| v.starts_with(prefix))
            .map(str::to_string)
            .collect(),
        Some(Schema::String { r#enum: Some(options), .. }) => {
            options.into_iter().filter(|v| v.starts_with(prefix)).collect()
        }
        _ => Vec::new(),
    };

    let total = values.len();
    Ok(json!({
        "completion": {
            "values": values,
            "total": total,
            "hasMore": false,
        }
    })
    .as_object()
    .cloned()
    .unwrap_or_default())
}

fn property_schema(schema: &Schema, name: &str) -> Option<Schema> {
    match schema {
        Schema::Object { properties, .. } => properties.get(name).cloned(),
        _ => None,
    }
}
