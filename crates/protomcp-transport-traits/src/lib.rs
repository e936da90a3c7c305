//! Shared transport contract for protomcp: the [`Transport`] trait, the
//! [`TransportMessage`] envelope, transport-level errors, and lightweight
//! config/metrics types every concrete transport crate depends on.

#![warn(missing_docs, rust_2018_idioms, clippy::all)]
#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

mod error;
mod message;
mod metrics;
mod traits;
mod types;

pub use error::{TransportError, TransportResult};
pub use message::TransportMessage;
pub use metrics::{AtomicMetrics, TransportMetrics};
pub use traits::{FrameHandler, Transport, TransportFactory, TransportId};
pub use types::{TransportCapabilities, TransportConfig, TransportState, TransportType};
