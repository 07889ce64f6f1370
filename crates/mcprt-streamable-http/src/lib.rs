//! # mcprt-streamable-http
//!
//! The Streamable HTTP transport (spec §4.4): a standing GET for
//! server-initiated messages, short-lived POSTs carrying one JSON-RPC
//! message each, session identification via `Mcp-Session-Id`, and a
//! resumable event store so a reconnecting client can replay what it
//! missed with `Last-Event-ID`.
//!
//! [`server::StreamableHttpServer`] is the axum-based server side;
//! [`client::StreamableHttpClientTransport`] is the reqwest-based client
//! side, implementing [`mcprt_transport::Transport`] so it plugs into the
//! same [`mcprt_session::Session`] multiplexer as every other transport.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod client;
pub mod event_store;
pub mod server;
pub mod session_id;
pub mod sse;
pub mod transport;

pub use event_store::{EventStore, InMemoryEventStore};
pub use server::{SessionHook, StreamableHttpServer};
pub use session_id::SessionId;
pub use sse::{SseDecoder, SseEvent};
pub use transport::StreamableServerTransport;

/// Header names used by the Streamable HTTP transport (spec §4.4).
pub mod headers {
    /// Carries the session id assigned at `initialize`.
    pub const MCP_SESSION_ID: &str = "Mcp-Session-Id";
    /// Carries the negotiated protocol version on every request after
    /// `initialize`.
    pub const MCP_PROTOCOL_VERSION: &str = "MCP-Protocol-Version";
    /// Carries the last event id seen, for SSE resumption.
    pub const LAST_EVENT_ID: &str = "Last-Event-ID";
}
