//! The `initialize` request/result pair (spec §6): phase one of the
//! three-phase handshake.

use serde::{Deserialize, Serialize};

use crate::capabilities::{ClientCapabilities, ServerCapabilities};
use mcprt_types::{ClientInfo, ServerInfo};

/// Sent by the client as the first request on a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitializeRequest {
    /// The highest protocol version the client supports
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Capabilities the client offers
    pub capabilities: ClientCapabilities,
    /// Client implementation identity
    #[serde(rename = "clientInfo")]
    pub client_info: ClientInfo,
}

/// The server's reply to `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitializeResult {
    /// The protocol version the server has chosen to speak
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Capabilities the server offers
    pub capabilities: ServerCapabilities,
    /// Server implementation identity
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    /// Freeform usage guidance for the client, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl InitializeResult {
    /// Build a minimal result with no instructions.
    #[must_use]
    pub fn new(
        protocol_version: impl Into<String>,
        capabilities: ServerCapabilities,
        server_info: ServerInfo,
    ) -> Self {
        Self {
            protocol_version: protocol_version.into(),
            capabilities,
            server_info,
            instructions: None,
        }
    }

    /// Attach instructions text.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}

/// Picks the protocol version the server will speak, per spec §6: the
/// server's own supported version if the client requested it exactly,
/// otherwise the server's latest version (letting the client decide whether
/// to proceed).
#[must_use]
pub fn negotiate_version(requested: &str, supported: &[&str]) -> String {
    if supported.contains(&requested) {
        requested.to_string()
    } else {
        supported
            .first()
            .map(|v| (*v).to_string())
            .unwrap_or_else(|| requested.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiate_exact_match() {
        let v = negotiate_version("2024-11-05", &["2025-06-18", "2024-11-05"]);
        assert_eq!(v, "2024-11-05");
    }

    #[test]
    fn negotiate_falls_back_to_latest() {
        let v = negotiate_version("1999-01-01", &["2025-06-18", "2024-11-05"]);
        assert_eq!(v, "2025-06-18");
    }
}
