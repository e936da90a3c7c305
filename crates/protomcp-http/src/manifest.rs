//! The OpenAPI / AI-plugin manifest routes are wired up here, but the
//! document shape itself is explicitly out of scope for this core (spec.md
//! §1: "OpenAPI/AI-plugin manifest emission... JSON shape is out of scope").
//! Callers that want `GET /openapi.json` and `GET /.well-known/ai-plugin.json`
//! to answer with real bodies supply a [`ManifestProvider`]; without one
//! those routes answer `404`.

use serde_json::Value;

/// Builds the two optional manifest documents (spec.md §6) from whatever the
/// tool registry currently holds. Implemented by an external collaborator —
/// this crate only calls it.
pub trait ManifestProvider: Send + Sync {
    /// The OpenAI plugin manifest served at `/.well-known/ai-plugin.json`,
    /// if this server publishes one.
    fn ai_plugin_manifest(&self, base_url: &str) -> Option<Value>;

    /// The OpenAPI document served at `/openapi.json`, if this server
    /// publishes one.
    fn openapi_spec(&self, base_url: &str) -> Option<Value>;
}
