//! `ToolProvider` / `ResourceProvider` / `PromptProvider`: the collaborator
//! interface spec.md §1 calls out as excluded from this repo's scope ("tool,
//! resource, and prompt *implementations*") but whose *shape* the core still
//! has to agree on, since [`protomcp_server::registry::Registry`] only
//! stores what a provider hands it.
//!
//! A provider answers for a whole collection of tools/resources/prompts at
//! once; [`register_tool_provider`] and friends adapt that collection view
//! into the registry's one-entry-at-a-time `ToolHandler`/`ResourceHandler`/
//! `PromptHandler` traits, registering one entry per item the provider
//! reports.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use protomcp_server::{
    PromptContents, PromptHandler, Registry, ResourceContents, ResourceHandler, ToolCallResult,
    ToolHandler,
};
use protomcp_types::{PromptMetadata, ResourceMetadata, ToolMetadata};

/// Supplies a set of callable tools. Implemented by the embedding
/// application; the core only ever calls `tools()` and `invoke()`.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Metadata for every tool this provider exposes.
    fn tools(&self) -> Vec<ToolMetadata>;

    /// Invoke `name` with already-schema-enriched `args`.
    async fn invoke(&self, name: &str, args: Map<String, Value>) -> protomcp_core::Result<ToolCallResult>;
}

/// Supplies a set of readable resources.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Metadata for every resource this provider exposes.
    fn resources(&self) -> Vec<ResourceMetadata>;

    /// Read the resource at `uri`.
    async fn read(&self, uri: &str) -> protomcp_core::Result<ResourceContents>;
}

/// Supplies a set of prompt templates.
#[async_trait]
pub trait PromptProvider: Send + Sync {
    /// Metadata for every prompt this provider exposes.
    fn prompts(&self) -> Vec<PromptMetadata>;

    /// Render `name` with already-schema-enriched `args`.
    async fn get(&self, name: &str, args: Map<String, Value>) -> protomcp_core::Result<PromptContents>;
}

struct ToolProviderAdapter {
    provider: Arc<dyn ToolProvider>,
    name: String,
}

#[async_trait]
impl ToolHandler for ToolProviderAdapter {
    async fn invoke(&self, args: Map<String, Value>) -> protomcp_core::Result<ToolCallResult> {
        self.provider.invoke(&self.name, args).await
    }
}

struct ResourceProviderAdapter {
    provider: Arc<dyn ResourceProvider>,
}

#[async_trait]
impl ResourceHandler for ResourceProviderAdapter {
    async fn read(&self, uri: &str) -> protomcp_core::Result<ResourceContents> {
        self.provider.read(uri).await
    }
}

struct PromptProviderAdapter {
    provider: Arc<dyn PromptProvider>,
    name: String,
}

#[async_trait]
impl PromptHandler for PromptProviderAdapter {
    async fn get(&self, args: Map<String, Value>) -> protomcp_core::Result<PromptContents> {
        self.provider.get(&self.name, args).await
    }
}

/// Register every tool `provider` reports under type key `T`.
pub fn register_tool_provider<T: 'static>(registry: &Registry, provider: Arc<dyn ToolProvider>) {
    for meta in provider.tools() {
        let adapter = ToolProviderAdapter { provider: provider.clone(), name: meta.name.clone() };
        registry.register_tool::<T>(meta, Arc::new(adapter));
    }
}

/// Register every resource `provider` reports under type key `T`.
pub fn register_resource_provider<T: 'static>(registry: &Registry, provider: Arc<dyn ResourceProvider>) {
    for meta in provider.resources() {
        let adapter = ResourceProviderAdapter { provider: provider.clone() };
        registry.register_resource::<T>(meta, Arc::new(adapter));
    }
}

/// Register every prompt `provider` reports under type key `T`.
pub fn register_prompt_provider<T: 'static>(registry: &Registry, provider: Arc<dyn PromptProvider>) {
    for meta in provider.prompts() {
        let adapter = PromptProviderAdapter { provider: provider.clone(), name: meta.name.clone() };
        registry.register_prompt::<T>(meta, Arc::new(adapter));
    }
}
