//! # mcprt-transport
//!
//! The transport abstraction (spec §4.2) and the stdio transport (spec
//! §4.3). A transport is an ordered, framed, bidirectional channel carrying
//! [`mcprt_protocol::JsonRpcMessage`] values; the session multiplexer is the
//! only thing that ever touches it.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod stdio;
pub mod types;

pub use error::{CloseDetails, TransportError, TransportResult};
pub use types::{TransportCapabilities, TransportState};

use async_trait::async_trait;
use mcprt_protocol::JsonRpcMessage;

/// An ordered, framed, bidirectional channel carrying JSON-RPC messages.
///
/// Implementations are not required to be safe for concurrent `send` calls;
/// the session multiplexer serializes writes through a single writer (spec
/// §4.2, §5).
#[async_trait]
pub trait Transport: Send + Sync {
    /// The transport's current lifecycle state.
    fn state(&self) -> TransportState;

    /// Capabilities this transport instance offers.
    fn capabilities(&self) -> TransportCapabilities;

    /// The transport-level session identifier, if this transport exposes
    /// one distinct from the negotiated MCP session id (e.g. none for
    /// stdio; an `Mcp-Session-Id` for streamable HTTP).
    fn session_id(&self) -> Option<String> {
        None
    }

    /// Enqueue a message for delivery. Ordering is preserved within a
    /// single transport instance.
    async fn send(&self, message: JsonRpcMessage) -> TransportResult<()>;

    /// Receive the next message. Returns `Ok(None)` when the transport has
    /// been drained following a close; never blocks forever past close.
    async fn receive(&self) -> TransportResult<Option<JsonRpcMessage>>;

    /// Gracefully close the transport, completing any pending `receive`
    /// after draining.
    async fn close(&self) -> TransportResult<()>;
}
