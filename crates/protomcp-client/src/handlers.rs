//! Hooks for server-initiated requests and unsolicited notifications
//! (spec.md §4.10: "Handles incoming ping requests with `{}` replies,
//! dispatches `sampling/createMessage` and `elicitation/create` requests to
//! user-supplied handlers, routes `notifications/progress` and
//! `notifications/message` to user-supplied handlers; ignores other
//! unsolicited notifications after logging").
//!
//! `protomcp-core::context::sample`/`elicit` treat both operations as opaque
//! `serde_json::Value` payloads on the server side; these handler traits
//! mirror that rather than introducing a second, client-only typed schema.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ClientError;

/// Answers `sampling/createMessage` requests from the server: the server
/// asks the client's host application to run an LLM completion on its
/// behalf.
#[async_trait]
pub trait SamplingHandler: Send + Sync {
    async fn handle_create_message(&self, params: Value) -> Result<Value, ClientError>;
}

/// Answers `elicitation/create` requests from the server: the server asks
/// the client's host application to collect structured input from the user.
#[async_trait]
pub trait ElicitationHandler: Send + Sync {
    async fn handle_elicit(&self, params: Value) -> Result<Value, ClientError>;
}

/// Called for every `notifications/progress` frame.
pub type ProgressHandler = Box<dyn Fn(Value) + Send + Sync>;

/// Called for every `notifications/message` (server log) frame.
pub type LogHandler = Box<dyn Fn(Value) + Send + Sync>;

/// The set of callbacks a caller may register before `initialize`. Each
/// slot is independent; leaving one empty degrades gracefully (a `sampling`
/// request with no handler gets a `-32601` reply, an unregistered
/// notification is logged and dropped).
#[derive(Default)]
pub struct HandlerRegistry {
    // `Arc`, not `Box`: the routing loop clones the handle out of its lock
    // guard before awaiting the handler, so the guard never crosses an
    // `.await` point.
    pub(crate) sampling: Option<Arc<dyn SamplingHandler>>,
    pub(crate) elicitation: Option<Arc<dyn ElicitationHandler>>,
    pub(crate) on_progress: Option<Arc<ProgressHandler>>,
    pub(crate) on_log: Option<Arc<LogHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_sampling_handler(&mut self, handler: impl SamplingHandler + 'static) {
        self.sampling = Some(Arc::new(handler));
    }

    pub fn set_elicitation_handler(&mut self, handler: impl ElicitationHandler + 'static) {
        self.elicitation = Some(Arc::new(handler));
    }

    pub fn set_progress_handler(&mut self, handler: impl Fn(Value) + Send + Sync + 'static) {
        self.on_progress = Some(Arc::new(Box::new(handler) as ProgressHandler));
    }

    pub fn set_log_handler(&mut self, handler: impl Fn(Value) + Send + Sync + 'static) {
        self.on_log = Some(Arc::new(Box::new(handler) as LogHandler));
    }

    pub fn has_sampling(&self) -> bool {
        self.sampling.is_some()
    }

    pub fn has_elicitation(&self) -> bool {
        self.elicitation.is_some()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("sampling", &self.sampling.is_some())
            .field("elicitation", &self.elicitation.is_some())
            .field("on_progress", &self.on_progress.is_some())
            .field("on_log", &self.on_log.is_some())
            .finish()
    }
}
