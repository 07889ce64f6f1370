//! MCP session identifiers (spec §4.4) exchanged via the `Mcp-Session-Id`
//! header, distinct from the negotiated protocol version or any transport
//! object identity.

use std::fmt;

/// Maximum accepted length for an inbound `Mcp-Session-Id` header value.
pub const MAX_SESSION_ID_LEN: usize = 256;

/// A session identifier, opaque to clients, assigned by the server on the
/// first successful `initialize` and echoed by the client on every
/// subsequent request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh, unguessable session id.
    #[must_use]
    pub fn new() -> Self {
        Self(format!("mcp-{}", uuid::Uuid::new_v4().simple()))
    }

    /// Parse a session id received over the wire (an `Mcp-Session-Id`
    /// header value). Rejects ids over [`MAX_SESSION_ID_LEN`] to bound
    /// storage use.
    pub fn parse(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.is_empty() || raw.len() > MAX_SESSION_ID_LEN {
            return None;
        }
        Some(Self(raw))
    }

    /// Borrow the id as a string slice, e.g. to set the `Mcp-Session-Id`
    /// response header.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_prefixed() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("mcp-"));
    }

    #[test]
    fn rejects_oversized_ids() {
        let too_long = "a".repeat(MAX_SESSION_ID_LEN + 1);
        assert!(SessionId::parse(too_long).is_none());
    }

    #[test]
    fn accepts_id_at_exact_limit() {
        let at_limit = "a".repeat(MAX_SESSION_ID_LEN);
        assert!(SessionId::parse(at_limit).is_some());
    }

    #[test]
    fn rejects_empty_id() {
        assert!(SessionId::parse("").is_none());
    }
}
