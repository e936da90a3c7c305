//! Request identifier - either a signed integer or a string.

use std::fmt;

use serde::{Deserialize, Serialize};

/// JSON-RPC request identifier.
///
/// Both variants must round-trip bit-exact through JSON: an integer id stays
/// an integer, a string id stays a string. `serde(untagged)` gives us that
/// for free because `serde_json` distinguishes number and string tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// Numeric identifier.
    Number(i64),
    /// String identifier.
    String(String),
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Id {
    fn from(n: i32) -> Self {
        Self::Number(i64::from(n))
    }
}

impl From<u64> for Id {
    fn from(n: u64) -> Self {
        Self::Number(n as i64)
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

/// Monotonically increasing integer id allocator, used by the client proxy
/// (spec.md §4.10: "allocates monotonically increasing integer ids").
#[derive(Debug, Default)]
pub struct IdSequence {
    next: std::sync::atomic::AtomicI64,
}

impl IdSequence {
    /// Create a sequence starting at 1.
    pub fn new() -> Self {
        Self {
            next: std::sync::atomic::AtomicI64::new(1),
        }
    }

    /// Allocate the next id.
    pub fn next(&self) -> Id {
        Id::Number(self.next.fetch_add(1, std::sync::atomic::Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_round_trips_as_number() {
        let id = Id::Number(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");
        assert_eq!(serde_json::from_str::<Id>(&json).unwrap(), id);
    }

    #[test]
    fn string_round_trips_as_string() {
        let id = Id::String("abc-123".to_string());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc-123\"");
        assert_eq!(serde_json::from_str::<Id>(&json).unwrap(), id);
    }

    #[test]
    fn sequence_is_monotonic() {
        let seq = IdSequence::new();
        assert_eq!(seq.next(), Id::Number(1));
        assert_eq!(seq.next(), Id::Number(2));
        assert_eq!(seq.next(), Id::Number(3));
    }
}
