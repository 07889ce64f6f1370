//! Session-level enums and the server-side initialize configuration
//! (spec §4.6).

use mcprt_protocol::ServerCapabilities;
use mcprt_types::ServerInfo;

/// Which side of the handshake this session plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Issues `initialize` and waits for the server's result.
    Client,
    /// Answers `initialize` and waits for `notifications/initialized`.
    Server,
}

/// Forward-only lifecycle states for the initialization handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing has been exchanged yet.
    PreInit,
    /// `initialize` is in flight (client) or answered but not yet
    /// acknowledged (server).
    Initializing,
    /// The handshake completed; normal traffic is allowed.
    Initialized,
    /// The session is tearing down; new work is rejected.
    Closing,
    /// The transport is gone.
    Closed,
}

/// What a server needs to answer `initialize` without going through the
/// generic request-handler registry (spec §4.6 is handled by the
/// multiplexer itself, not user code).
#[derive(Debug, Clone)]
pub struct ServerInitConfig {
    /// Protocol versions this server understands, most preferred first.
    pub supported_versions: Vec<String>,
    /// Capabilities this server advertises.
    pub capabilities: ServerCapabilities,
    /// This server's identity.
    pub server_info: ServerInfo,
    /// Freeform instructions handed to the client on success.
    pub instructions: Option<String>,
}
