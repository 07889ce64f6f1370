//! JSON-RPC 2.0 envelope types and the presence-based shape discriminator
//! from spec §4.1.
//!
//! The decoder does not look for an explicit type tag; instead it inspects
//! which of `method`/`id`/`result`/`error` are present on the top-level
//! object, per the table in spec §4.1.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request_id::RequestId;

/// The JSON-RPC version string every envelope must carry.
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC request: expects a response carrying the same id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    /// Must equal [`JSONRPC_VERSION`]
    pub jsonrpc: String,
    /// Request method name
    pub method: String,
    /// Request parameters, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Request id, unique for the lifetime of the session
    pub id: RequestId,
}

impl JsonRpcRequest {
    /// Build a request envelope.
    #[must_use]
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// A JSON-RPC notification: no id, no response expected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcNotification {
    /// Must equal [`JSONRPC_VERSION`]
    pub jsonrpc: String,
    /// Notification method name
    pub method: String,
    /// Notification parameters, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Build a notification envelope.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// A successful JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    /// Must equal [`JSONRPC_VERSION`]
    pub jsonrpc: String,
    /// Id of the request this responds to
    pub id: RequestId,
    /// The result payload
    pub result: Value,
}

impl JsonRpcResponse {
    /// Build a success response envelope.
    #[must_use]
    pub fn new(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result,
        }
    }
}

/// A JSON-RPC error object, embedded in a [`JsonRpcErrorResponse`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    /// Numeric error code (spec §7)
    pub code: i32,
    /// Human-readable message; MUST NOT leak internal state for InternalError
    /// unless the handler explicitly supplied one
    pub message: String,
    /// Optional structured error data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A JSON-RPC error response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcErrorResponse {
    /// Must equal [`JSONRPC_VERSION`]
    pub jsonrpc: String,
    /// Id of the request this responds to
    pub id: RequestId,
    /// The error payload
    pub error: JsonRpcError,
}

impl JsonRpcErrorResponse {
    /// Build an error response envelope.
    #[must_use]
    pub fn new(id: RequestId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            error,
        }
    }
}

/// The four-way tagged variant of a JSON-RPC 2.0 message (spec §4.1, §9
/// design note: "polymorphic message envelope -> tagged variant").
#[derive(Debug, Clone, PartialEq)]
pub enum JsonRpcMessage {
    /// A request expecting a response
    Request(JsonRpcRequest),
    /// A notification, no response expected
    Notification(JsonRpcNotification),
    /// A successful response
    Response(JsonRpcResponse),
    /// An error response
    Error(JsonRpcErrorResponse),
}

impl JsonRpcMessage {
    /// The request/response id carried by this message, if any.
    #[must_use]
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Request(r) => Some(&r.id),
            Self::Notification(_) => None,
            Self::Response(r) => Some(&r.id),
            Self::Error(e) => Some(&e.id),
        }
    }

    /// Serialize to a single line of minified JSON with no embedded newlines,
    /// as required by the stdio transport's framing (spec §4.3).
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let value = self.to_value()?;
        serde_json::to_string(&value)
    }

    /// Serialize to a `serde_json::Value`.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Request(r) => serde_json::to_value(r),
            Self::Notification(n) => serde_json::to_value(n),
            Self::Response(r) => serde_json::to_value(r),
            Self::Error(e) => serde_json::to_value(e),
        }
    }

    /// Parse one JSON-RPC message from a `serde_json::Value` using the
    /// presence table from spec §4.1:
    ///
    /// | method | id | result | error | shape |
    /// |---|---|---|---|---|
    /// | yes | yes | no | no | Request |
    /// | yes | no  | no | no | Notification |
    /// | no  | yes | yes| no | Response |
    /// | no  | yes | no | yes| Error |
    ///
    /// Any other combination, or a missing/mismatched `jsonrpc`, is a parse
    /// error.
    pub fn from_value(value: Value) -> Result<Self, ParseError> {
        let obj = value.as_object().ok_or(ParseError::NotAnObject)?;

        match obj.get("jsonrpc") {
            Some(Value::String(v)) if v == JSONRPC_VERSION => {}
            _ => return Err(ParseError::BadVersion),
        }

        let has_method = obj.contains_key("method");
        let has_id = obj.contains_key("id") && !obj["id"].is_null();
        let has_result = obj.contains_key("result");
        let has_error = obj.contains_key("error");

        match (has_method, has_id, has_result, has_error) {
            (true, true, false, false) => {
                let req: JsonRpcRequest =
                    serde_json::from_value(value).map_err(ParseError::Shape)?;
                if req.method.starts_with("notifications/") {
                    return Err(ParseError::NotificationMethodOnRequest);
                }
                Ok(Self::Request(req))
            }
            (true, false, false, false) => {
                let notif: JsonRpcNotification =
                    serde_json::from_value(value).map_err(ParseError::Shape)?;
                Ok(Self::Notification(notif))
            }
            (false, true, true, false) => {
                let resp: JsonRpcResponse =
                    serde_json::from_value(value).map_err(ParseError::Shape)?;
                Ok(Self::Response(resp))
            }
            (false, true, false, true) => {
                let err: JsonRpcErrorResponse =
                    serde_json::from_value(value).map_err(ParseError::Shape)?;
                Ok(Self::Error(err))
            }
            _ => Err(ParseError::AmbiguousShape),
        }
    }

    /// Parse one JSON-RPC message from raw JSON text.
    pub fn from_str(text: &str) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_str(text).map_err(ParseError::Json)?;
        Self::from_value(value)
    }
}

/// A codec-level parse failure (spec §7: `Parse error`, code -32700, or
/// `Invalid request`, code -32600, depending on kind).
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Malformed JSON text
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Top-level value is not a JSON object
    #[error("top-level JSON-RPC value must be an object")]
    NotAnObject,
    /// Missing or mismatched `jsonrpc` field
    #[error("missing or invalid jsonrpc version field")]
    BadVersion,
    /// The presence of method/id/result/error does not match any known shape
    #[error("ambiguous JSON-RPC shape: not a request, notification, response, or error")]
    AmbiguousShape,
    /// A request's method began with `notifications/`, which is reserved for notifications
    #[error("a request's method must not begin with 'notifications/'")]
    NotificationMethodOnRequest,
    /// The message matched a shape but failed to deserialize into it
    #[error("failed to deserialize as the matched shape: {0}")]
    Shape(serde_json::Error),
}

impl ParseError {
    /// Maps this parse failure to its JSON-RPC error code (spec §7).
    #[must_use]
    pub fn error_code(&self) -> i32 {
        match self {
            Self::NotificationMethodOnRequest | Self::AmbiguousShape => -32600,
            _ => -32700,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn discriminates_request() {
        let v = json!({"jsonrpc":"2.0","method":"tools/list","id":1});
        assert!(matches!(JsonRpcMessage::from_value(v).unwrap(), JsonRpcMessage::Request(_)));
    }

    #[test]
    fn discriminates_notification() {
        let v = json!({"jsonrpc":"2.0","method":"notifications/initialized"});
        assert!(matches!(JsonRpcMessage::from_value(v).unwrap(), JsonRpcMessage::Notification(_)));
    }

    #[test]
    fn discriminates_response() {
        let v = json!({"jsonrpc":"2.0","id":1,"result":{}});
        assert!(matches!(JsonRpcMessage::from_value(v).unwrap(), JsonRpcMessage::Response(_)));
    }

    #[test]
    fn discriminates_error() {
        let v = json!({"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"nope"}});
        assert!(matches!(JsonRpcMessage::from_value(v).unwrap(), JsonRpcMessage::Error(_)));
    }

    #[test]
    fn rejects_request_disguised_as_notification_method() {
        let v = json!({"jsonrpc":"2.0","method":"notifications/cancelled","id":1});
        let err = JsonRpcMessage::from_value(v).unwrap_err();
        assert_eq!(err.error_code(), -32600);
    }

    #[test]
    fn rejects_bad_version() {
        let v = json!({"jsonrpc":"1.0","method":"ping","id":1});
        assert!(JsonRpcMessage::from_value(v).is_err());
    }

    #[test]
    fn rejects_ambiguous_shape_result_and_error_both_present() {
        let v = json!({"jsonrpc":"2.0","id":1,"result":{},"error":{"code":-1,"message":"x"}});
        let err = JsonRpcMessage::from_value(v).unwrap_err();
        assert_eq!(err.error_code(), -32600);
    }

    #[test]
    fn round_trips_request_through_line_and_back() {
        let req = JsonRpcRequest::new(RequestId::Number(7), "tools/call", Some(json!({"name":"echo"})));
        let msg = JsonRpcMessage::Request(req.clone());
        let line = msg.to_line().unwrap();
        assert!(!line.contains('\n'));
        let back = JsonRpcMessage::from_str(&line).unwrap();
        assert_eq!(back, JsonRpcMessage::Request(req));
    }
}
