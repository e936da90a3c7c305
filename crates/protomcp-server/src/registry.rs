//! Tool/resource/prompt registry facade (spec.md §4.2, component C2).
//!
//! A process-wide table keyed by *type identity* — the Rust type of the
//! server object that registered a given tool/resource/prompt, standing in
//! for "a stable per-type identifier produced by the registration macro"
//! (spec.md §9). The macro itself is the excluded registry-generator
//! collaborator; this crate only needs *a* stable key, and `TypeId` is the
//! natural native one.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use protomcp_core::{Error, ToolError};
use protomcp_types::{ContentBlock, PromptMessage, PromptMetadata, ResourceMetadata, Schema, ToolMetadata};
use serde_json::{Map, Value};

/// Result of a `tools/call` invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolCallResult {
    pub content: Vec<ContentBlock>,
    pub is_error: bool,
}

impl ToolCallResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            is_error: true,
        }
    }
}

/// Implemented by whatever server-side object backs a registered tool. This
/// is the `invoke(name, args)` half of the `ToolProvider` interface
/// spec.md §1 calls out as an external collaborator the core only consumes.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, args: Map<String, Value>) -> protomcp_core::Result<ToolCallResult>;
}

/// Contents returned from `resources/read`.
#[derive(Debug, Clone)]
pub struct ResourceContents {
    pub uri: String,
    pub mime_type: Option<String>,
    pub text: String,
}

#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn read(&self, uri: &str) -> protomcp_core::Result<ResourceContents>;
}

/// Contents returned from `prompts/get`.
#[derive(Debug, Clone)]
pub struct PromptContents {
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

#[async_trait]
pub trait PromptHandler: Send + Sync {
    async fn get(&self, args: Map<String, Value>) -> protomcp_core::Result<PromptContents>;
}

struct ToolEntry {
    meta: ToolMetadata,
    handler: Arc<dyn ToolHandler>,
}

struct ResourceEntry {
    meta: ResourceMetadata,
    handler: Arc<dyn ResourceHandler>,
}

struct PromptEntry {
    meta: PromptMetadata,
    handler: Arc<dyn PromptHandler>,
}

#[derive(Default)]
struct RegistryInner {
    tools: HashMap<TypeId, Vec<ToolEntry>>,
    resources: HashMap<TypeId, Vec<ResourceEntry>>,
    prompts: HashMap<TypeId, Vec<PromptEntry>>,
}

/// The process-wide registry. Guarded by one coarse lock, per spec.md §4.2
/// ("contention is not expected because lookup is O(1) after
/// initialization").
#[derive(Default)]
pub struct Registry {
    inner: Mutex<RegistryInner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `registerTool` — last-writer-wins on name collision within a type.
    pub fn register_tool<T: 'static>(&self, meta: ToolMetadata, handler: Arc<dyn ToolHandler>) {
        let key = TypeId::of::<T>();
        let mut inner = self.inner.lock();
        let entries = inner.tools.entry(key).or_default();
        if let Some(existing) = entries.iter_mut().find(|e| e.meta.name == meta.name) {
            existing.meta = meta;
            existing.handler = handler;
        } else {
            entries.push(ToolEntry { meta, handler });
        }
    }

    pub fn register_resource<T: 'static>(&self, meta: ResourceMetadata, handler: Arc<dyn ResourceHandler>) {
        let key = TypeId::of::<T>();
        let mut inner = self.inner.lock();
        let entries = inner.resources.entry(key).or_default();
        if let Some(existing) = entries.iter_mut().find(|e| e.meta.name == meta.name) {
            existing.meta = meta;
            existing.handler = handler;
        } else {
            entries.push(ResourceEntry { meta, handler });
        }
    }

    pub fn register_prompt<T: 'static>(&self, meta: PromptMetadata, handler: Arc<dyn PromptHandler>) {
        let key = TypeId::of::<T>();
        let mut inner = self.inner.lock();
        let entries = inner.prompts.entry(key).or_default();
        if let Some(existing) = entries.iter_mut().find(|e| e.meta.name == meta.name) {
            existing.meta = meta;
            existing.handler = handler;
        } else {
            entries.push(PromptEntry { meta, handler });
        }
    }

    pub fn list_tools<T: 'static>(&self) -> Vec<ToolMetadata> {
        let inner = self.inner.lock();
        inner
            .tools
            .get(&TypeId::of::<T>())
            .map(|entries| entries.iter().map(|e| e.meta.clone()).collect())
            .unwrap_or_default()
    }

    pub fn list_resources<T: 'static>(&self) -> Vec<ResourceMetadata> {
        let inner = self.inner.lock();
        inner
            .resources
            .get(&TypeId::of::<T>())
            .map(|entries| entries.iter().map(|e| e.meta.clone()).collect())
            .unwrap_or_default()
    }

    pub fn list_prompts<T: 'static>(&self) -> Vec<PromptMetadata> {
        let inner = self.inner.lock();
        inner
            .prompts
            .get(&TypeId::of::<T>())
            .map(|entries| entries.iter().map(|e| e.meta.clone()).collect())
            .unwrap_or_default()
    }

    fn find_tool<T: 'static>(&self, name: &str) -> Option<(ToolMetadata, Arc<dyn ToolHandler>)> {
        let inner = self.inner.lock();
        inner
            .tools
            .get(&TypeId::of::<T>())?
            .iter()
            .find(|e| e.meta.name == name)
            .map(|e| (e.meta.clone(), e.handler.clone()))
    }

    fn find_resource<T: 'static>(&self, uri: &str) -> Option<(ResourceMetadata, Arc<dyn ResourceHandler>)> {
        let inner = self.inner.lock();
        inner
            .resources
            .get(&TypeId::of::<T>())?
            .iter()
            .find(|e| e.meta.uri == uri)
            .map(|e| (e.meta.clone(), e.handler.clone()))
    }

    fn find_prompt<T: 'static>(&self, name: &str) -> Option<(PromptMetadata, Arc<dyn PromptHandler>)> {
        let inner = self.inner.lock();
        inner
            .prompts
            .get(&TypeId::of::<T>())?
            .iter()
            .find(|e| e.meta.name == name)
            .map(|e| (e.meta.clone(), e.handler.clone()))
    }

    /// `tools/call`: enrich arguments against the declared schema, then
    /// invoke the registered handler.
    pub async fn call_tool<T: 'static>(
        &self,
        name: &str,
        args: Map<String, Value>,
    ) -> protomcp_core::Result<ToolCallResult> {
        let (meta, handler) = self
            .find_tool::<T>(name)
            .ok_or_else(|| Error::Tool(ToolError::UnknownTool(name.to_string())))?;
        let enriched = enrich_arguments(&meta.input_schema, args)?;
        handler.invoke(enriched).await
    }

    pub async fn read_resource<T: 'static>(&self, uri: &str) -> protomcp_core::Result<ResourceContents> {
        let (_, handler) = self
            .find_resource::<T>(uri)
            .ok_or_else(|| Error::Tool(ToolError::UnknownTool(uri.to_string())))?;
        handler.read(uri).await
    }

    pub async fn get_prompt<T: 'static>(
        &self,
        name: &str,
        args: Map<String, Value>,
    ) -> protomcp_core::Result<PromptContents> {
        let (meta, handler) = self
            .find_prompt::<T>(name)
            .ok_or_else(|| Error::Tool(ToolError::UnknownTool(name.to_string())))?;
        let enriched = enrich_arguments(&meta.input_schema, args)?;
        handler.get(enriched).await
    }
}

/// `enrichArguments` (spec.md §4.2): fill in schema defaults, reject a
/// missing required parameter that has no default, and attempt
/// string→native coercion for `integer`/`number`/`boolean` fields before
/// rejecting a type mismatch.
///
/// Idempotent by construction: re-running this on its own output only ever
/// fills in already-present values (a no-op) or defaults (already filled),
/// so `enrich(enrich(args)) == enrich(args)`.
pub fn enrich_arguments(
    schema: &Schema,
    mut args: Map<String, Value>,
) -> protomcp_core::Result<Map<String, Value>> {
    let Schema::Object { properties, required, .. } = schema else {
        // A non-object input schema takes arguments as-is.
        return Ok(args);
    };

    for (name, prop_schema) in properties.iter() {
        match args.get(name).cloned() {
            Some(value) => {
                let coerced = coerce(prop_schema, value, name)?;
                args.insert(name.clone(), coerced);
            }
            None => {
                if let Some(default) = prop_schema.default_value() {
                    args.insert(name.clone(), default.clone());
                } else if required.contains(name) {
                    return Err(Error::missing_required_parameter(name.clone()));
                }
            }
        }
    }

    Ok(args)
}

fn coerce(schema: &Schema, value: Value, param: &str) -> protomcp_core::Result<Value> {
    if schema.matches_kind(&value) {
        return Ok(value);
    }

    // String -> native coercion policy (spec.md §4.2).
    if let Value::String(s) = &value {
        match schema {
            Schema::Number { integer, .. } => {
                if *integer {
                    if let Ok(n) = s.parse::<i64>() {
                        return Ok(Value::Number(n.into()));
                    }
                } else if let Ok(n) = s.parse::<f64>() {
                    if let Some(num) = serde_json::Number::from_f64(n) {
                        return Ok(Value::Number(num));
                    }
                }
            }
            Schema::Boolean { .. } => {
                if let Ok(b) = s.parse::<bool>() {
                    return Ok(Value::Bool(b));
                }
            }
            _ => {}
        }
    }

    Err(Error::Tool(ToolError::InvalidArgumentType {
        param: param.to_string(),
        expected: schema_type_name(schema),
        actual: value_type_name(&value),
    }))
}

fn schema_type_name(schema: &Schema) -> String {
    match schema {
        Schema::String { .. } => "string",
        Schema::Number { integer: true, .. } => "integer",
        Schema::Number { .. } => "number",
        Schema::Boolean { .. } => "boolean",
        Schema::Array { .. } => "array",
        Schema::Object { .. } => "object",
        Schema::Enum { .. } => "enum",
        Schema::OneOf(_) => "oneOf",
    }
    .to_string()
}

fn value_type_name(value: &Value) -> String {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use protomcp_types::OrderedMap;
    use serde_json::json;
    use std::collections::BTreeSet;

    struct Marker;

    fn object_schema(props: Vec<(&str, Schema)>, required: &[&str]) -> Schema {
        let mut map = OrderedMap::default();
        for (k, v) in props {
            map.insert(k.to_string(), v);
        }
        Schema::Object {
            properties: map,
            required: required.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
            additional_properties: false,
            default: None,
        }
    }

    fn number_schema() -> Schema {
        Schema::Number {
            integer: true,
            min: None,
            max: None,
            default: None,
        }
    }

    #[test]
    fn enrich_fills_defaults() {
        let schema = object_schema(
            vec![(
                "count",
                Schema::Number {
                    integer: true,
                    min: None,
                    max: None,
                    default: Some(json!(1)),
                },
            )],
            &[],
        );
        let enriched = enrich_arguments(&schema, Map::new()).unwrap();
        assert_eq!(enriched["count"], json!(1));
    }

    #[test]
    fn enrich_rejects_missing_required() {
        let schema = object_schema(vec![("b", number_schema())], &["b"]);
        let err = enrich_arguments(&schema, Map::new()).unwrap_err();
        assert!(matches!(err, Error::Tool(ToolError::MissingRequiredParameter(p)) if p == "b"));
    }

    #[test]
    fn enrich_coerces_string_to_integer() {
        let schema = object_schema(vec![("b", number_schema())], &["b"]);
        let mut args = Map::new();
        args.insert("b".into(), json!("42"));
        let enriched = enrich_arguments(&schema, args).unwrap();
        assert_eq!(enriched["b"], json!(42));
    }

    #[test]
    fn enrich_is_idempotent() {
        let schema = object_schema(
            vec![(
                "flag",
                Schema::Boolean {
                    default: Some(json!(true)),
                },
            )],
            &[],
        );
        let once = enrich_arguments(&schema, Map::new()).unwrap();
        let twice = enrich_arguments(&schema, once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn call_tool_returns_missing_required_parameter_error() {
        struct AddHandler;
        #[async_trait]
        impl ToolHandler for AddHandler {
            async fn invoke(&self, args: Map<String, Value>) -> protomcp_core::Result<ToolCallResult> {
                let a = args["a"].as_i64().unwrap();
                let b = args["b"].as_i64().unwrap();
                Ok(ToolCallResult::text((a + b).to_string()))
            }
        }

        let registry = Registry::new();
        let schema = object_schema(vec![("a", number_schema()), ("b", number_schema())], &["a", "b"]);
        let meta = ToolMetadata::new("add", schema);
        registry.register_tool::<Marker>(meta, Arc::new(AddHandler));

        let mut args = Map::new();
        args.insert("a".into(), json!(1));
        let err = registry.call_tool::<Marker>("add", args).await.unwrap_err();
        assert!(matches!(err, Error::Tool(ToolError::MissingRequiredParameter(p)) if p == "b"));
    }

    #[test]
    fn registration_is_last_writer_wins() {
        struct Handler1;
        #[async_trait]
        impl ToolHandler for Handler1 {
            async fn invoke(&self, _args: Map<String, Value>) -> protomcp_core::Result<ToolCallResult> {
                Ok(ToolCallResult::text("v1"))
            }
        }
        struct Handler2;
        #[async_trait]
        impl ToolHandler for Handler2 {
            async fn invoke(&self, _args: Map<String, Value>) -> protomcp_core::Result<ToolCallResult> {
                Ok(ToolCallResult::text("v2"))
            }
        }

        let registry = Registry::new();
        registry.register_tool::<Marker>(ToolMetadata::new("x", number_schema()), Arc::new(Handler1));
        registry.register_tool::<Marker>(ToolMetadata::new("x", number_schema()), Arc::new(Handler2));
        assert_eq!(registry.list_tools::<Marker>().len(), 1);
    }
}
