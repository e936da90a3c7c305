//! TCP transport with optional Bonjour/mDNS advertisement (spec.md §4.6,
//! component C6).

#![warn(missing_docs, rust_2018_idioms, clippy::all)]
#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub mod discovery;
mod transport;

pub use discovery::{browse, Advertisement, DiscoveredService, DEFAULT_SERVICE_TYPE};
pub use transport::{TcpTransport, TcpTransportFactory};
