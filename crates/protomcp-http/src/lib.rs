//! HTTP+SSE transport (spec.md §4.7, component C7): Streamable HTTP on
//! `/mcp`, legacy SSE on `/sse` + `/messages/{id}`, OpenAPI-style tool
//! calls, and an OAuth 2.0 transparent proxy in front of all of it.

#![warn(missing_docs, rust_2018_idioms, clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod auth_guard;
mod body;
pub mod config;
mod cors;
pub mod manifest;
mod routes;
mod sse;
pub mod transport;

pub use config::{HttpConfig, KeepAliveConfig, KeepAliveMode};
pub use manifest::ManifestProvider;
pub use transport::{HttpState, HttpTransport};
