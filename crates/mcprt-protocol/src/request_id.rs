//! JSON-RPC request identifiers.
//!
//! Per spec §4.1: string and integer ids are distinct even if they print the
//! same, and numeric ids outside the 64-bit signed integer range are
//! rejected at parse time rather than silently truncated.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A JSON-RPC request id: either a string or a 64-bit signed integer.
///
/// `RequestId::String("7")` and `RequestId::Number(7)` are distinct values
/// even though they render identically in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestId {
    /// String-valued id
    String(String),
    /// Integer-valued id
    Number(i64),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Number(n) => serializer.serialize_i64(*n),
        }
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::String(s) => Ok(Self::String(s)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Number)
                .ok_or_else(|| serde::de::Error::custom("request id out of 64-bit signed integer range")),
            other => Err(serde::de::Error::custom(format!(
                "request id must be a string or integer, got {other}"
            ))),
        }
    }
}

/// Monotonically increasing id allocator, starting at 1 per session (spec §4.5).
#[derive(Debug, Default)]
pub struct RequestIdAllocator {
    next: std::sync::atomic::AtomicI64,
}

impl RequestIdAllocator {
    /// Create an allocator whose first id will be 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: std::sync::atomic::AtomicI64::new(1),
        }
    }

    /// Allocate the next id. Never reused within the allocator's lifetime.
    pub fn next(&self) -> RequestId {
        let id = self.next.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        RequestId::Number(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_and_number_with_same_text_are_distinct() {
        assert_ne!(RequestId::String("7".into()), RequestId::Number(7));
    }

    #[test]
    fn rejects_id_outside_i64_range() {
        let big = serde_json::json!(u64::MAX);
        let result: Result<RequestId, _> = serde_json::from_value(big);
        assert!(result.is_err());
    }

    #[test]
    fn allocator_starts_at_one_and_never_repeats() {
        let alloc = RequestIdAllocator::new();
        let ids: Vec<_> = (0..5).map(|_| alloc.next()).collect();
        assert_eq!(ids[0], RequestId::Number(1));
        assert_eq!(ids.len(), ids.iter().collect::<std::collections::HashSet<_>>().len());
    }
}
