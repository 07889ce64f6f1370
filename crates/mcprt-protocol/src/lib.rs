//! # mcprt-protocol
//!
//! The JSON-RPC 2.0 wire layer of the MCP runtime core (spec §4.1): the
//! envelope types, the presence-based shape discriminator that parses a
//! message without a type tag, capability negotiation records (spec §4.6,
//! §6), and the protocol-level error code mapping (spec §7).
//!
//! This crate knows nothing about transports or dispatch; it only turns
//! bytes into envelopes and back.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod capabilities;
pub mod error;
pub mod initialize;
pub mod jsonrpc;
pub mod request_id;

pub use capabilities::{ClientCapabilities, ServerCapabilities};
pub use error::{ErrorCode, ProtocolError};
pub use initialize::{InitializeRequest, InitializeResult};
pub use jsonrpc::{
    JSONRPC_VERSION, JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse,
};
pub use request_id::RequestId;
