//! JSON-RPC message framing: batch decode, encode, and classification
//! (spec.md §4.1, component C1).

use protomcp_types::{canonicalize, Message};
use serde_json::Value;

use crate::error::Error;

/// What a decoded [`Message`] is, for the dispatcher to pick between
/// "process this" and "correlate this with a pending outbound call".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Request,
    Notification,
    Response,
    Error,
}

/// Classify a message by which of its four shapes it takes.
pub fn classify(message: &Message) -> Classification {
    match message {
        Message::Request(_) => Classification::Request,
        Message::Notification(_) => Classification::Notification,
        Message::Response(_) => Classification::Response,
        Message::Error(_) => Classification::Error,
    }
}

/// Decode a frame into a batch of messages. Accepts either a single JSON
/// object or a JSON array of objects; an empty array is a protocol error
/// (spec.md §3, §6).
pub fn decode_batch(bytes: &[u8]) -> Result<Vec<Message>, Error> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| Error::Parse(format!("invalid JSON: {e}")))?;

    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(Error::InvalidRequest("batch must not be empty".into()));
            }
            items
                .into_iter()
                .map(|item| {
                    serde_json::from_value::<Message>(item)
                        .map_err(|e| Error::InvalidRequest(e.to_string()))
                })
                .collect()
        }
        obj @ Value::Object(_) => {
            let message = serde_json::from_value::<Message>(obj)
                .map_err(|e| Error::InvalidRequest(e.to_string()))?;
            Ok(vec![message])
        }
        _ => Err(Error::InvalidRequest(
            "top-level JSON value must be an object or an array of objects".into(),
        )),
    }
}

/// Encode a single message with canonical (sorted-key) formatting.
pub fn encode(message: &Message) -> Vec<u8> {
    let value = serde_json::to_value(message).expect("Message serialization cannot fail");
    serde_json::to_vec(&canonicalize(&value)).expect("canonical Value serialization cannot fail")
}

/// Encode a batch of messages as a single JSON array.
pub fn encode_batch(messages: &[Message]) -> Vec<u8> {
    let values: Vec<Value> = messages
        .iter()
        .map(|m| canonicalize(&serde_json::to_value(m).expect("Message serialization cannot fail")))
        .collect();
    serde_json::to_vec(&Value::Array(values)).expect("canonical Value serialization cannot fail")
}

/// Encode an `f64` the way spec.md §4.1 requires: finite values become JSON
/// numbers, non-finite values become the literal strings `"Infinity"`,
/// `"-Infinity"`, `"NaN"` (`serde_json::Number` cannot represent them at
/// all, so this is the only lossless encoding available).
pub fn encode_float(value: f64) -> Value {
    if value.is_nan() {
        Value::String("NaN".to_string())
    } else if value.is_infinite() {
        Value::String(if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string())
    } else {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string()))
    }
}

/// Encode a timestamp as ISO-8601 with an explicit timezone offset
/// (spec.md §4.1).
pub fn encode_timestamp(value: chrono::DateTime<chrono::Utc>) -> Value {
    Value::String(value.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use protomcp_types::{Id, Notification, Request};
    use serde_json::json;

    #[test]
    fn decodes_single_object() {
        let bytes = br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
        let messages = decode_batch(bytes).unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].is_request());
    }

    #[test]
    fn decodes_batch_array() {
        let bytes = br#"[{"jsonrpc":"2.0","id":1,"method":"ping"},{"jsonrpc":"2.0","method":"notifications/initialized"}]"#;
        let messages = decode_batch(bytes).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].is_notification());
    }

    #[test]
    fn rejects_empty_batch() {
        let err = decode_batch(b"[]").unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = decode_batch(b"{not json").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn round_trips_through_encode_decode() {
        let original = Message::Request(Request {
            id: Id::String("x".into()),
            method: "tools/call".into(),
            params: Some(json!({"name": "add"}).as_object().unwrap().clone()),
        });
        let bytes = encode(&original);
        let decoded = decode_batch(&bytes).unwrap();
        assert_eq!(decoded[0], original);
    }

    #[test]
    fn encode_sorts_keys() {
        let msg = Message::Notification(Notification {
            method: "notifications/progress".into(),
            params: Some(json!({"zeta": 1, "alpha": 2}).as_object().unwrap().clone()),
        });
        let bytes = encode(&msg);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.find("\"alpha\"").unwrap() < text.find("\"zeta\"").unwrap());
    }

    #[test]
    fn non_finite_floats_become_literal_strings() {
        assert_eq!(encode_float(f64::NAN), json!("NaN"));
        assert_eq!(encode_float(f64::INFINITY), json!("Infinity"));
        assert_eq!(encode_float(f64::NEG_INFINITY), json!("-Infinity"));
        assert_eq!(encode_float(1.5), json!(1.5));
    }
}
