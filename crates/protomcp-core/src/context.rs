//! Task-local request and session context (spec.md §4.3, §4.4, component
//! C3/C4). Handler code reaches these via free functions rather than
//! threading a context argument through every call — this is a deliberate
//! divergence from the teacher (who threads `RequestContext` explicitly
//! through function signatures) mandated by spec.md §9's design notes.

use std::sync::Arc;

use async_trait::async_trait;
use protomcp_types::{ClientCapabilities, Id, LogLevel};
use serde_json::Value;

use crate::error::Error;

tokio::task_local! {
    static CURRENT_SESSION: Arc<dyn SessionHandle>;
    static CURRENT_REQUEST: RequestContext;
}

/// Metadata for one inbound message, bound for the lifetime of its handler
/// invocation (spec.md §3, "Request context").
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub id: Option<Id>,
    pub method: Option<String>,
    /// `_meta.progressToken` from the request params, if the caller
    /// supplied one.
    pub progress_token: Option<Value>,
}

impl RequestContext {
    pub fn new(id: Option<Id>, method: Option<String>, progress_token: Option<Value>) -> Self {
        Self {
            id,
            method,
            progress_token,
        }
    }

    /// Bind `self` as the current request context for the duration of
    /// `fut`.
    pub async fn scope<F, T>(self, fut: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        CURRENT_REQUEST.scope(self, fut).await
    }

    /// The context bound for the currently executing handler, if any.
    pub fn current() -> Option<RequestContext> {
        CURRENT_REQUEST.try_with(|ctx| ctx.clone()).ok()
    }
}

/// What `RequestContext`'s free functions need from "the current session":
/// send a fire-and-forget notification, or issue a server→client request and
/// await its correlated reply. Implemented by `protomcp-server::Session`;
/// kept here as a trait so this crate need not depend on the server crate
/// (spec.md §9, "weak back-reference" note — this is the same idea applied
/// to the session↔context relationship instead of session↔transport).
#[async_trait]
pub trait SessionHandle: Send + Sync {
    fn session_id(&self) -> uuid::Uuid;

    fn minimum_log_level(&self) -> LogLevel;

    fn client_capabilities(&self) -> Option<ClientCapabilities>;

    /// Send a notification with no reply expected.
    fn notify(&self, method: &str, params: Option<Value>);

    /// Issue a server→client request and suspend until a reply with the
    /// same id arrives (or the session is torn down).
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, Error>;
}

/// Bind `session` as current for the duration of `fut` (one per connection,
/// spans many requests).
pub async fn bind_session<F, T>(session: Arc<dyn SessionHandle>, fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    CURRENT_SESSION.scope(session, fut).await
}

/// The session bound for the current task, if any.
pub fn current_session() -> Option<Arc<dyn SessionHandle>> {
    CURRENT_SESSION.try_with(|s| s.clone()).ok()
}

/// Raised when a server→client operation is attempted outside of a bound
/// session, or the bound session's client lacks the needed capability.
#[derive(Debug, thiserror::Error, Clone)]
pub enum ContextError {
    #[error("No active session bound to this task")]
    NoActiveSession,
    #[error("Client has no sampling support")]
    ClientHasNoSamplingSupport,
    #[error("Client has no elicitation support")]
    ClientHasNoElicitationSupport,
}

/// Emit `notifications/progress` if-and-only-if the inbound request carried
/// a progress token (spec.md §4.4).
pub fn report_progress(progress: f64, total: Option<f64>, message: Option<String>) {
    let Some(ctx) = RequestContext::current() else {
        return;
    };
    let Some(token) = ctx.progress_token.clone() else {
        return;
    };
    let Some(session) = current_session() else {
        return;
    };
    let mut params = serde_json::Map::new();
    params.insert("progressToken".into(), token);
    params.insert("progress".into(), crate::codec::encode_float(progress));
    if let Some(total) = total {
        params.insert("total".into(), crate::codec::encode_float(total));
    }
    if let Some(message) = message {
        params.insert("message".into(), Value::String(message));
    }
    session.notify("notifications/progress", Some(Value::Object(params)));
}

fn send_list_changed(method: &str) {
    if let Some(session) = current_session() {
        session.notify(method, None);
    }
}

/// `notifications/tools/list_changed`.
pub fn send_tool_list_changed() {
    send_list_changed("notifications/tools/list_changed");
}

/// `notifications/resources/list_changed`.
pub fn send_resource_list_changed() {
    send_list_changed("notifications/resources/list_changed");
}

/// `notifications/prompts/list_changed`.
pub fn send_prompt_list_changed() {
    send_list_changed("notifications/prompts/list_changed");
}

/// Issue a `sampling/createMessage` server→client request (spec.md §4.4).
pub async fn sample(request: Value) -> Result<Value, Error> {
    let session = current_session().ok_or_else(|| {
        Error::Internal(ContextError::NoActiveSession.to_string())
    })?;
    if !session
        .client_capabilities()
        .map(|c| c.sampling)
        .unwrap_or(false)
    {
        return Err(Error::Internal(
            ContextError::ClientHasNoSamplingSupport.to_string(),
        ));
    }
    session.request("sampling/createMessage", Some(request)).await
}

/// Issue an `elicitation/create` server→client request (spec.md §4.4).
pub async fn elicit(message: String, schema: protomcp_types::Schema) -> Result<Value, Error> {
    let session = current_session().ok_or_else(|| {
        Error::Internal(ContextError::NoActiveSession.to_string())
    })?;
    if !session
        .client_capabilities()
        .map(|c| c.elicitation)
        .unwrap_or(false)
    {
        return Err(Error::Internal(
            ContextError::ClientHasNoElicitationSupport.to_string(),
        ));
    }
    let params = serde_json::json!({
        "message": message,
        "requestedSchema": schema,
    });
    session.request("elicitation/create", Some(params)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeSession {
        notified: Mutex<Vec<(String, Option<Value>)>>,
        caps: ClientCapabilities,
    }

    #[async_trait]
    impl SessionHandle for FakeSession {
        fn session_id(&self) -> uuid::Uuid {
            uuid::Uuid::nil()
        }
        fn minimum_log_level(&self) -> LogLevel {
            LogLevel::Info
        }
        fn client_capabilities(&self) -> Option<ClientCapabilities> {
            Some(self.caps.clone())
        }
        fn notify(&self, method: &str, params: Option<Value>) {
            self.notified.lock().unwrap().push((method.to_string(), params));
        }
        async fn request(&self, _method: &str, _params: Option<Value>) -> Result<Value, Error> {
            Ok(Value::Null)
        }
    }

    #[tokio::test]
    async fn progress_is_silent_without_token() {
        let session: Arc<dyn SessionHandle> = Arc::new(FakeSession {
            notified: Mutex::new(vec![]),
            caps: ClientCapabilities::default(),
        });
        let ctx = RequestContext::new(None, None, None);
        ctx.scope(bind_session(session.clone(), async {
            report_progress(0.5, None, None);
        }))
        .await;
    }

    #[tokio::test]
    async fn progress_emits_when_token_present() {
        let session = Arc::new(FakeSession {
            notified: Mutex::new(vec![]),
            caps: ClientCapabilities::default(),
        });
        let session_dyn: Arc<dyn SessionHandle> = session.clone();
        let ctx = RequestContext::new(None, None, Some(Value::String("tok".into())));
        ctx.scope(bind_session(session_dyn, async {
            report_progress(0.5, Some(1.0), Some("halfway".into()));
        }))
        .await;
        assert_eq!(session.notified.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sample_without_session_fails() {
        let err = sample(Value::Null).await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[tokio::test]
    async fn sample_without_capability_fails() {
        let session: Arc<dyn SessionHandle> = Arc::new(FakeSession {
            notified: Mutex::new(vec![]),
            caps: ClientCapabilities::default(),
        });
        let result = bind_session(session, sample(Value::Null)).await;
        assert!(result.is_err());
    }
}
