//! MCP logging levels (RFC 5424 syslog severities), used by
//! `logging/setLevel` and `notifications/message` (spec.md §4.9).

use serde::{Deserialize, Serialize};

/// The eight RFC 5424 severities, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
}

impl LogLevel {
    /// Parse from the wire name used by `logging/setLevel`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "emergency" => Some(Self::Emergency),
            "alert" => Some(Self::Alert),
            "critical" => Some(Self::Critical),
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "notice" => Some(Self::Notice),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            _ => None,
        }
    }
}

impl Default for LogLevel {
    /// Sessions default to `info`, matching the teacher's default verbosity.
    fn default() -> Self {
        Self::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_severity_descending() {
        assert!(LogLevel::Emergency < LogLevel::Debug);
        assert!(LogLevel::Error < LogLevel::Info);
    }

    #[test]
    fn monotonic_filter_is_level_order() {
        // A session listening at `warning` should receive `error` but not `info`.
        let threshold = LogLevel::Warning;
        assert!(LogLevel::Error <= threshold);
        assert!(!(LogLevel::Info <= threshold));
    }
}
