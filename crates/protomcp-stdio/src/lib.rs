//! Line-delimited stdio transport (spec.md §4.5, component C5).
//!
//! Frames are one JSON message per `\n`-terminated line. Two concrete
//! constructors mirror the teacher's split: [`StdioTransport::new`] talks
//! over the current process's stdin/stdout; [`StdioTransport::from_raw`]
//! wraps any pair of async streams (a spawned child's pipes, or an
//! in-process duplex for tests and embedded server-in-client use).

mod transport;

pub use transport::{StdioTransport, StdioTransportFactory};
