//! Message codec, error taxonomy, and task-local request/session context
//! shared by every protomcp transport and the dispatcher.

#![warn(missing_docs, rust_2018_idioms, clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod context;
pub mod error;

pub use codec::{classify, decode_batch, encode, encode_batch, encode_float, encode_timestamp, Classification};
pub use context::{
    bind_session, current_session, elicit, report_progress, sample, send_prompt_list_changed,
    send_resource_list_changed, send_tool_list_changed, ContextError, RequestContext,
    SessionHandle,
};
pub use error::{Error, Result, ToolError};
