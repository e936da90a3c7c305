//! Recursive JSON Schema subset used for tool/resource/prompt parameter and
//! result shapes (spec.md §3). The decoder is deliberately tolerant of the
//! handful of real-world JSON Schema dialects tools show up with; `Schema`
//! itself is the single canonical shape once decoded.

use std::collections::BTreeSet;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A schema node. Decoding tolerates: absent `type` (inferred from sibling
/// keys), nullable `type: ["T", "null"]`, `additionalProperties` as either a
/// bool or a schema (coerced to `true`), and `anyOf` treated as `oneOf`.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// `type: "string"`.
    String {
        /// e.g. `"date-time"`, `"uuid"`.
        format: Option<String>,
        /// Allowed literal values, if restricted.
        r#enum: Option<Vec<String>>,
        min_length: Option<u64>,
        max_length: Option<u64>,
        default: Option<Value>,
    },
    /// `type: "number"` or `"integer"`.
    Number {
        /// `true` if the source declared `"integer"` rather than `"number"`.
        integer: bool,
        min: Option<f64>,
        max: Option<f64>,
        default: Option<Value>,
    },
    /// `type: "boolean"`.
    Boolean { default: Option<Value> },
    /// `type: "array"`.
    Array {
        items: Box<Schema>,
        default: Option<Value>,
    },
    /// `type: "object"`.
    Object {
        properties: indexmap_like::OrderedMap,
        required: BTreeSet<String>,
        additional_properties: bool,
        default: Option<Value>,
    },
    /// A closed set of literal values (JSON Schema `enum` at the top level,
    /// not nested under `type: "string"`).
    Enum {
        values: Vec<Value>,
        names: Option<Vec<String>>,
        default: Option<Value>,
    },
    /// `oneOf` / `anyOf` (the latter is folded into the former on decode).
    OneOf(Vec<Schema>),
}

/// A small insertion-ordered string-keyed map, since object property order
/// matters for deterministic schema re-emission but `serde_json::Map`'s
/// ordering is a build-time feature flag we don't want to leak into this
/// type's public shape.
pub mod indexmap_like {
    use super::Schema;

    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct OrderedMap(pub Vec<(String, Schema)>);

    impl OrderedMap {
        pub fn get(&self, key: &str) -> Option<&Schema> {
            self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
        }

        pub fn iter(&self) -> impl Iterator<Item = &(String, Schema)> {
            self.0.iter()
        }

        pub fn insert(&mut self, key: String, value: Schema) {
            if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == key) {
                slot.1 = value;
            } else {
                self.0.push((key, value));
            }
        }
    }
}

impl Schema {
    /// This schema's [`Value::default()`]-equivalent, if it declares one.
    pub fn default_value(&self) -> Option<&Value> {
        match self {
            Schema::String { default, .. }
            | Schema::Number { default, .. }
            | Schema::Boolean { default }
            | Schema::Array { default, .. }
            | Schema::Object { default, .. }
            | Schema::Enum { default, .. } => default.as_ref(),
            Schema::OneOf(_) => None,
        }
    }

    /// Whether `value` is a plausible match for this schema's coarse type
    /// (used by the registry's type-coercion policy, not full JSON Schema
    /// validation).
    pub fn matches_kind(&self, value: &Value) -> bool {
        match self {
            Schema::String { .. } => value.is_string(),
            Schema::Number { .. } => value.is_number(),
            Schema::Boolean { .. } => value.is_boolean(),
            Schema::Array { .. } => value.is_array(),
            Schema::Object { .. } => value.is_object(),
            Schema::Enum { values, .. } => values.contains(value),
            Schema::OneOf(options) => options.iter().any(|s| s.matches_kind(value)),
        }
    }
}

fn type_tag(value: &Map<String, Value>) -> Option<String> {
    match value.get("type") {
        Some(Value::String(s)) => Some(s.clone()),
        // Nullable shorthand: ["T", "null"] -> "T".
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null")
            .map(str::to_string),
        _ => None,
    }
}

fn infer_type(value: &Map<String, Value>) -> Option<String> {
    if value.contains_key("properties") {
        Some("object".into())
    } else if value.contains_key("items") {
        Some("array".into())
    } else if value.contains_key("enum") {
        Some("enum".into())
    } else if value.contains_key("oneOf") || value.contains_key("anyOf") {
        Some("oneOf".into())
    } else if value.contains_key("minimum")
        || value.contains_key("maximum")
        || value.contains_key("minLength")
        || value.contains_key("maxLength")
    {
        // ambiguous between string/number bounds; prefer string since
        // minLength/maxLength are string-only keys.
        if value.contains_key("minLength") || value.contains_key("maxLength") {
            Some("string".into())
        } else {
            Some("number".into())
        }
    } else {
        None
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let obj = value
            .as_object()
            .ok_or_else(|| D::Error::custom("schema must be a JSON object"))?;

        if let Some(one_of) = obj.get("oneOf").or_else(|| obj.get("anyOf")) {
            let options: Vec<Schema> = serde_json::from_value(one_of.clone())
                .map_err(|e| D::Error::custom(format!("invalid oneOf/anyOf: {e}")))?;
            return Ok(Schema::OneOf(options));
        }

        if let Some(Value::Array(values)) = obj.get("enum") {
            let names = obj
                .get("enumNames")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect());
            return Ok(Schema::Enum {
                values: values.clone(),
                names,
                default: obj.get("default").cloned(),
            });
        }

        let tag = type_tag(obj).or_else(|| infer_type(obj)).unwrap_or_else(|| "string".into());
        let default = obj.get("default").cloned();

        match tag.as_str() {
            "string" => Ok(Schema::String {
                format: obj.get("format").and_then(Value::as_str).map(str::to_string),
                r#enum: obj.get("enum").and_then(Value::as_array).map(|a| {
                    a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
                }),
                min_length: obj.get("minLength").and_then(Value::as_u64),
                max_length: obj.get("maxLength").and_then(Value::as_u64),
                default,
            }),
            "number" | "integer" => Ok(Schema::Number {
                integer: tag == "integer",
                min: obj.get("minimum").and_then(Value::as_f64),
                max: obj.get("maximum").and_then(Value::as_f64),
                default,
            }),
            "boolean" => Ok(Schema::Boolean { default }),
            "array" => {
                let items = match obj.get("items") {
                    Some(v) => {
                        serde_json::from_value(v.clone()).map_err(|e| D::Error::custom(format!("invalid items schema: {e}")))?
                    }
                    None => Schema::String {
                        format: None,
                        r#enum: None,
                        min_length: None,
                        max_length: None,
                        default: None,
                    },
                };
                Ok(Schema::Array {
                    items: Box::new(items),
                    default,
                })
            }
            "object" => {
                let mut properties = indexmap_like::OrderedMap::default();
                if let Some(Value::Object(props)) = obj.get("properties") {
                    for (key, raw) in props {
                        let schema: Schema = serde_json::from_value(raw.clone())
                            .map_err(|e| D::Error::custom(format!("invalid property `{key}`: {e}")))?;
                        properties.insert(key.clone(), schema);
                    }
                }
                let required = obj
                    .get("required")
                    .and_then(Value::as_array)
                    .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                    .unwrap_or_default();
                // additionalProperties: bool | schema -> coerced to bool (a
                // schema means "yes, but constrained"; we only track the
                // bool per spec.md §3(c)).
                let additional_properties = match obj.get("additionalProperties") {
                    Some(Value::Bool(b)) => *b,
                    Some(Value::Object(_)) => true,
                    _ => true,
                };
                Ok(Schema::Object {
                    properties,
                    required,
                    additional_properties,
                    default,
                })
            }
            other => Err(D::Error::custom(format!("unsupported schema type `{other}`"))),
        }
    }
}

impl Serialize for Schema {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        match self {
            Schema::String {
                format,
                r#enum,
                min_length,
                max_length,
                default,
            } => {
                map.serialize_entry("type", "string")?;
                if let Some(f) = format {
                    map.serialize_entry("format", f)?;
                }
                if let Some(e) = r#enum {
                    map.serialize_entry("enum", e)?;
                }
                if let Some(v) = min_length {
                    map.serialize_entry("minLength", v)?;
                }
                if let Some(v) = max_length {
                    map.serialize_entry("maxLength", v)?;
                }
                if let Some(d) = default {
                    map.serialize_entry("default", d)?;
                }
            }
            Schema::Number { integer, min, max, default } => {
                map.serialize_entry("type", if *integer { "integer" } else { "number" })?;
                if let Some(v) = min {
                    map.serialize_entry("minimum", v)?;
                }
                if let Some(v) = max {
                    map.serialize_entry("maximum", v)?;
                }
                if let Some(d) = default {
                    map.serialize_entry("default", d)?;
                }
            }
            Schema::Boolean { default } => {
                map.serialize_entry("type", "boolean")?;
                if let Some(d) = default {
                    map.serialize_entry("default", d)?;
                }
            }
            Schema::Array { items, default } => {
                map.serialize_entry("type", "array")?;
                map.serialize_entry("items", items.as_ref())?;
                if let Some(d) = default {
                    map.serialize_entry("default", d)?;
                }
            }
            Schema::Object {
                properties,
                required,
                additional_properties,
                default,
            } => {
                map.serialize_entry("type", "object")?;
                let props: Map<String, Value> = properties
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::to_value(v).unwrap()))
                    .collect();
                map.serialize_entry("properties", &props)?;
                if !required.is_empty() {
                    map.serialize_entry("required", required)?;
                }
                map.serialize_entry("additionalProperties", additional_properties)?;
                if let Some(d) = default {
                    map.serialize_entry("default", d)?;
                }
            }
            Schema::Enum { values, names, default } => {
                map.serialize_entry("enum", values)?;
                if let Some(n) = names {
                    map.serialize_entry("enumNames", n)?;
                }
                if let Some(d) = default {
                    map.serialize_entry("default", d)?;
                }
            }
            Schema::OneOf(options) => {
                map.serialize_entry("oneOf", options)?;
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn infers_object_from_properties() {
        let value = json!({"properties": {"a": {"type": "string"}}, "required": ["a"]});
        let schema: Schema = serde_json::from_value(value).unwrap();
        match schema {
            Schema::Object { properties, required, .. } => {
                assert!(properties.get("a").is_some());
                assert!(required.contains("a"));
            }
            _ => panic!("expected object schema"),
        }
    }

    #[test]
    fn nullable_type_array_picks_non_null() {
        let value = json!({"type": ["string", "null"]});
        let schema: Schema = serde_json::from_value(value).unwrap();
        assert!(matches!(schema, Schema::String { .. }));
    }

    #[test]
    fn additional_properties_schema_coerces_to_true() {
        let value = json!({"type": "object", "properties": {}, "additionalProperties": {"type": "string"}});
        let schema: Schema = serde_json::from_value(value).unwrap();
        match schema {
            Schema::Object { additional_properties, .. } => assert!(additional_properties),
            _ => panic!("expected object schema"),
        }
    }

    #[test]
    fn any_of_is_treated_as_one_of() {
        let value = json!({"anyOf": [{"type": "string"}, {"type": "number"}]});
        let schema: Schema = serde_json::from_value(value).unwrap();
        match schema {
            Schema::OneOf(options) => assert_eq!(options.len(), 2),
            _ => panic!("expected oneOf schema"),
        }
    }

    #[test]
    fn matches_kind_checks_enum_membership() {
        let schema = Schema::Enum {
            values: vec![json!("a"), json!("b")],
            names: None,
            default: None,
        };
        assert!(schema.matches_kind(&json!("a")));
        assert!(!schema.matches_kind(&json!("c")));
    }
}
