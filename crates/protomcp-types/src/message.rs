//! JSON-RPC 2.0 message model: the four-variant tagged union described in
//! spec.md §3/§4.1. This is the single, canonical `Message` definition — the
//! teacher codebase this was distilled from grew several historical
//! `JSONRPCMessage` shapes side by side; here there is exactly one.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::id::Id;

/// `"2.0"`, always present on the wire.
pub const JSONRPC_VERSION: &str = "2.0";

/// A single JSON-RPC 2.0 message: request, notification, response, or error.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A request expecting a response (`id` + `method`).
    Request(Request),
    /// A one-way message (`method`, no `id`).
    Notification(Notification),
    /// A successful reply (`id` + `result`).
    Response(Response),
    /// A failed reply (`id`? + `error`).
    Error(ErrorResponse),
}

/// `{id, method, params?}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Correlates this request with its eventual response.
    pub id: Id,
    /// Dotted method name, e.g. `"tools/call"`.
    pub method: String,
    /// Named parameters, if any.
    pub params: Option<Map<String, Value>>,
}

/// `{method, params?}` — no `id`, no reply expected.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Notification {
    /// Dotted method name, e.g. `"notifications/initialized"`.
    pub method: String,
    /// Named parameters, if any.
    pub params: Option<Map<String, Value>>,
}

/// `{id, result}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// The id of the request this answers.
    pub id: Id,
    /// The method's result object.
    pub result: Map<String, Value>,
}

/// `{id?, error}`. `id` is `None` when the offending message's id could not
/// be determined (e.g. the body failed to parse at all).
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    /// The id of the request this answers, if known.
    pub id: Option<Id>,
    /// The error payload.
    pub error: RpcError,
}

/// JSON-RPC error object: `{code, message, data?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// One of the standard JSON-RPC codes, or an application-specific one.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Build an error with no `data`.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach structured `data` to an error.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Standard JSON-RPC / MCP error codes (spec.md §6).
pub mod error_code {
    /// Malformed JSON.
    pub const PARSE_ERROR: i64 = -32700;
    /// Valid JSON that is not a valid JSON-RPC message.
    pub const INVALID_REQUEST: i64 = -32600;
    /// No handler for the given method.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Params failed schema validation or a required param is missing.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Handler raised an unexpected error.
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Generic application-level server error.
    pub const SERVER_ERROR: i64 = -32000;
    /// Used in the body of a 401 JSON-RPC error response.
    pub const UNAUTHORIZED: i64 = 401;
}

impl Message {
    /// Build a successful response.
    pub fn response(id: Id, result: Map<String, Value>) -> Self {
        Self::Response(Response { id, result })
    }

    /// Build an error response with a known id.
    pub fn error(id: Option<Id>, error: RpcError) -> Self {
        Self::Error(ErrorResponse { id, error })
    }

    /// The `id` of this message, if it has one (requests, responses, and
    /// errors with a known id all have one; notifications never do).
    pub fn id(&self) -> Option<&Id> {
        match self {
            Self::Request(r) => Some(&r.id),
            Self::Notification(_) => None,
            Self::Response(r) => Some(&r.id),
            Self::Error(e) => e.id.as_ref(),
        }
    }

    /// The method name, if this message carries one.
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(r) => Some(&r.method),
            Self::Notification(n) => Some(&n.method),
            Self::Response(_) | Self::Error(_) => None,
        }
    }

    /// `true` for [`Message::Request`].
    pub fn is_request(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    /// `true` for [`Message::Notification`].
    pub fn is_notification(&self) -> bool {
        matches!(self, Self::Notification(_))
    }

    /// `true` for [`Message::Response`] or [`Message::Error`].
    pub fn is_reply(&self) -> bool {
        matches!(self, Self::Response(_) | Self::Error(_))
    }
}

impl Serialize for Message {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut obj = Map::new();
        obj.insert("jsonrpc".into(), Value::String(JSONRPC_VERSION.into()));
        match self {
            Message::Request(r) => {
                obj.insert("id".into(), serde_json::to_value(&r.id).unwrap());
                obj.insert("method".into(), Value::String(r.method.clone()));
                if let Some(params) = &r.params {
                    obj.insert("params".into(), Value::Object(params.clone()));
                }
            }
            Message::Notification(n) => {
                obj.insert("method".into(), Value::String(n.method.clone()));
                if let Some(params) = &n.params {
                    obj.insert("params".into(), Value::Object(params.clone()));
                }
            }
            Message::Response(r) => {
                obj.insert("id".into(), serde_json::to_value(&r.id).unwrap());
                obj.insert("result".into(), Value::Object(r.result.clone()));
            }
            Message::Error(e) => {
                if let Some(id) = &e.id {
                    obj.insert("id".into(), serde_json::to_value(id).unwrap());
                } else {
                    obj.insert("id".into(), Value::Null);
                }
                obj.insert("error".into(), serde_json::to_value(&e.error).unwrap());
            }
        }
        Value::Object(obj).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let obj = value
            .as_object()
            .ok_or_else(|| D::Error::custom("expected a JSON object"))?;

        let has_method = obj.contains_key("method");
        let has_id = obj.contains_key("id");
        let has_error = obj.contains_key("error");

        // Tie-break per spec.md §4.1: `method` present wins (request or
        // notification); otherwise `id` present (with no `method`) means
        // response or error.
        if has_method {
            let method = obj
                .get("method")
                .and_then(Value::as_str)
                .ok_or_else(|| D::Error::custom("`method` must be a string"))?
                .to_string();
            let params = obj.get("params").and_then(Value::as_object).cloned();
            if has_id {
                let id: Id = serde_json::from_value(obj["id"].clone())
                    .map_err(|e| D::Error::custom(format!("invalid id: {e}")))?;
                Ok(Message::Request(Request { id, method, params }))
            } else {
                Ok(Message::Notification(Notification { method, params }))
            }
        } else if has_id || has_error {
            let id = match obj.get("id") {
                Some(Value::Null) | None => None,
                Some(v) => Some(
                    serde_json::from_value::<Id>(v.clone())
                        .map_err(|e| D::Error::custom(format!("invalid id: {e}")))?,
                ),
            };
            if has_error {
                let error: RpcError = serde_json::from_value(obj["error"].clone())
                    .map_err(|e| D::Error::custom(format!("invalid error object: {e}")))?;
                Ok(Message::Error(ErrorResponse { id, error }))
            } else {
                let id = id.ok_or_else(|| D::Error::custom("response requires a non-null id"))?;
                let result = obj
                    .get("result")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                Ok(Message::Response(Response { id, result }))
            }
        } else {
            Err(D::Error::custom(
                "message matches no known variant (missing method/id/error)",
            ))
        }
    }
}

/// Recursively re-order a [`Value`]'s object keys alphabetically so the
/// encoded byte sequence is deterministic, per spec.md §4.1.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.iter().map(|(k, v)| (k.clone(), canonicalize(v))).collect();
            let mut out = Map::new();
            for (k, v) in sorted {
                out.insert(k, v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_round_trips() {
        let msg = Message::Request(Request {
            id: Id::Number(1),
            method: "ping".into(),
            params: None,
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["method"], "ping");
        let back: Message = serde_json::from_value(value).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn notification_has_no_id() {
        let value = json!({"jsonrpc":"2.0","method":"notifications/initialized"});
        let msg: Message = serde_json::from_value(value).unwrap();
        assert!(msg.is_notification());
        assert_eq!(msg.id(), None);
    }

    #[test]
    fn id_with_no_method_is_response() {
        let value = json!({"jsonrpc":"2.0","id":7,"result":{}});
        let msg: Message = serde_json::from_value(value).unwrap();
        assert!(matches!(msg, Message::Response(_)));
    }

    #[test]
    fn error_with_null_id() {
        let value = json!({"jsonrpc":"2.0","id":null,"error":{"code":-32700,"message":"Parse error"}});
        let msg: Message = serde_json::from_value(value).unwrap();
        match msg {
            Message::Error(e) => {
                assert_eq!(e.id, None);
                assert_eq!(e.error.code, -32700);
            }
            _ => panic!("expected error response"),
        }
    }

    #[test]
    fn unrecognized_shape_is_rejected() {
        let value = json!({"jsonrpc":"2.0"});
        assert!(serde_json::from_value::<Message>(value).is_err());
    }

    #[test]
    fn canonicalize_sorts_keys() {
        let value = json!({"b": 1, "a": 2, "nested": {"z": 1, "y": 2}});
        let sorted = canonicalize(&value);
        let keys: Vec<_> = sorted.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string(), "nested".to_string()]);
    }
}
