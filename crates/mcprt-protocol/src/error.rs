//! Protocol-level error codes (spec §7).

use crate::jsonrpc::JsonRpcError;
use crate::request_id::RequestId;

/// Standard JSON-RPC 2.0 error codes, plus the MCP-specific extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received
    ParseError,
    /// The JSON sent is not a valid request object
    InvalidRequest,
    /// The method does not exist or is not available
    MethodNotFound,
    /// Invalid method parameters
    InvalidParams,
    /// Internal error, must not leak implementation details
    InternalError,
    /// A request was cancelled, either by the peer or locally
    Cancelled,
}

impl ErrorCode {
    /// The numeric JSON-RPC code.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::Cancelled => -32800,
        }
    }

    /// The canonical message for this code.
    #[must_use]
    pub fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::Cancelled => "Request cancelled",
        }
    }
}

/// A protocol-level error: either a JSON-RPC error destined for a peer, or a
/// local condition (transport closed) that never crosses the wire as a
/// JSON-RPC error object.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The underlying transport is closed or closing
    #[error("transport is closed")]
    TransportClosed,
    /// The session was asked to process a message while shutting down
    #[error("session is shutting down")]
    ShuttingDown,
    /// A JSON-RPC error to be sent to, or received from, the peer
    #[error("{}: {}", .code.default_message(), message)]
    Rpc {
        /// The error code category
        code: ErrorCode,
        /// A human-readable message
        message: String,
        /// Optional structured data
        data: Option<serde_json::Value>,
    },
}

impl ProtocolError {
    /// Build a `Rpc` variant from a code with its default message.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self::Rpc {
            code,
            message: code.default_message().to_string(),
            data: None,
        }
    }

    /// Build a `Rpc` variant with a custom message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Render this error as a JSON-RPC error response for the given request id.
    ///
    /// Returns `None` for local-only conditions ([`Self::TransportClosed`],
    /// [`Self::ShuttingDown`]) that have no wire representation.
    #[must_use]
    pub fn to_response(&self, id: RequestId) -> Option<crate::jsonrpc::JsonRpcErrorResponse> {
        match self {
            Self::TransportClosed | Self::ShuttingDown => None,
            Self::Rpc { code, message, data } => Some(crate::jsonrpc::JsonRpcErrorResponse::new(
                id,
                JsonRpcError {
                    code: code.code(),
                    message: message.clone(),
                    data: data.clone(),
                },
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_spec_table() {
        assert_eq!(ErrorCode::ParseError.code(), -32700);
        assert_eq!(ErrorCode::InvalidRequest.code(), -32600);
        assert_eq!(ErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(ErrorCode::InvalidParams.code(), -32602);
        assert_eq!(ErrorCode::InternalError.code(), -32603);
        assert_eq!(ErrorCode::Cancelled.code(), -32800);
    }

    #[test]
    fn transport_closed_has_no_wire_representation() {
        let err = ProtocolError::TransportClosed;
        assert!(err.to_response(RequestId::Number(1)).is_none());
    }

    #[test]
    fn rpc_error_renders_response() {
        let err = ProtocolError::from_code(ErrorCode::MethodNotFound);
        let resp = err.to_response(RequestId::Number(3)).unwrap();
        assert_eq!(resp.error.code, -32601);
    }
}
