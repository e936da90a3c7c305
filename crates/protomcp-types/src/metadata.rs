//! Tool / resource / prompt metadata shapes (spec.md §3).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::Schema;

/// Hints about a tool's side effects, surfaced to clients for UI purposes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolAnnotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "readOnlyHint", skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    #[serde(rename = "destructiveHint", skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    #[serde(rename = "idempotentHint", skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    #[serde(rename = "openWorldHint", skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
}

/// `{name, description?, inputSchema, outputSchema?, annotations?, isAsync, isThrowing}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolMetadata {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Schema,
    pub output_schema: Option<Schema>,
    pub annotations: Option<ToolAnnotations>,
    /// Whether the underlying implementation is async (informational only;
    /// the registry always awaits the invocation regardless).
    pub is_async: bool,
    /// Whether the underlying implementation can raise an error (as opposed
    /// to always succeeding).
    pub is_throwing: bool,
}

impl ToolMetadata {
    pub fn new(name: impl Into<String>, input_schema: Schema) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema,
            output_schema: None,
            annotations: None,
            is_async: true,
            is_throwing: true,
        }
    }
}

/// Resource metadata: tool shape plus `uri` template and `mimeType`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceMetadata {
    pub name: String,
    pub description: Option<String>,
    pub uri: String,
    pub mime_type: Option<String>,
    pub input_schema: Schema,
    pub output_schema: Option<Schema>,
    pub annotations: Option<ToolAnnotations>,
    pub is_async: bool,
    pub is_throwing: bool,
}

/// Prompt metadata: tool shape plus a message template.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptMetadata {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Schema,
    pub output_schema: Option<Schema>,
    pub annotations: Option<ToolAnnotations>,
    pub is_async: bool,
    pub is_throwing: bool,
    /// Template messages this prompt expands to; rendered with the supplied
    /// arguments by the provider at `prompts/get` time.
    pub messages_template: Vec<PromptMessage>,
}

/// One message in a prompt template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: ContentBlock,
}

/// `user` or `assistant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    User,
    Assistant,
}

/// A single content item: text, an embedded resource, or an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
    Image { data: String, mime_type: String },
    Resource { uri: String, mime_type: Option<String>, text: Option<String> },
}

impl ContentBlock {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text { text: s.into() }
    }
}

/// MCP server identity reported in `initialize` (spec.md §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// MCP client identity sent in `initialize` (spec.md §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

/// Capability advertisement exchanged at `initialize` time. Kept as a loose
/// bag of booleans/extension map rather than the full MCP capability tree,
/// since the core only needs to know "does the client support sampling /
/// elicitation" (spec.md §4.4) and otherwise treats capabilities opaquely.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClientCapabilities {
    #[serde(default)]
    pub sampling: bool,
    #[serde(default)]
    pub elicitation: bool,
    #[serde(default)]
    pub roots: bool,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Server capability advertisement.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerCapabilities {
    #[serde(default)]
    pub tools: bool,
    #[serde(default)]
    pub resources: bool,
    #[serde(default)]
    pub prompts: bool,
    #[serde(default)]
    pub logging: bool,
    #[serde(default)]
    pub completion: bool,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// The protocol version this implementation speaks (spec.md §4.9).
pub const PROTOCOL_VERSION: &str = "2025-06-18";
