//! [`McpClient`]: a thin, typed wrapper around a client-role [`Session`]
//! offering the standard MCP request methods without hand-building JSON.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use mcprt_protocol::capabilities::ClientCapabilities;
use mcprt_protocol::{ErrorCode, ProtocolError};
use mcprt_session::{Role, Session};
use mcprt_types::{ClientInfo, Prompt, PromptResult, Resource, ResourceResult, ResourceTemplate, Tool, ToolResult};

/// A connected MCP client session, wrapping the raw [`Session`] with typed
/// request helpers for the ten standard methods.
pub struct McpClient {
    session: Arc<Session>,
}

impl McpClient {
    /// Spawn a client-role session over `transport` and perform the
    /// `initialize` handshake.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the handshake fails or the peer
    /// negotiates a protocol version this client doesn't support.
    pub async fn connect(
        transport: Arc<dyn mcprt_transport::Transport>,
        supported_versions: &[&str],
        capabilities: ClientCapabilities,
        client_info: ClientInfo,
    ) -> Result<Self, ProtocolError> {
        let session = Session::spawn(transport, Role::Client, None);
        session.initialize_as_client(supported_versions, capabilities, client_info).await?;
        Ok(Self { session })
    }

    /// The underlying session, for access to peer callbacks, raw requests,
    /// or notification registration this wrapper doesn't cover.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// `tools/list`.
    pub async fn list_tools(&self, cursor: Option<&str>) -> Result<(Vec<Tool>, Option<String>), ProtocolError> {
        let params = cursor.map(|c| serde_json::json!({ "cursor": c }));
        let value = self.session.send_request("tools/list", params, CancellationToken::new()).await?;
        decode_page(value, "tools")
    }

    /// `tools/call`.
    pub async fn call_tool(&self, name: &str, arguments: Option<Value>) -> Result<ToolResult, ProtocolError> {
        let mut params = serde_json::json!({ "name": name });
        if let Some(arguments) = arguments {
            params["arguments"] = arguments;
        }
        let value = self.session.send_request("tools/call", Some(params), CancellationToken::new()).await?;
        decode(value)
    }

    /// `prompts/list`.
    pub async fn list_prompts(&self, cursor: Option<&str>) -> Result<(Vec<Prompt>, Option<String>), ProtocolError> {
        let params = cursor.map(|c| serde_json::json!({ "cursor": c }));
        let value = self.session.send_request("prompts/list", params, CancellationToken::new()).await?;
        decode_page(value, "prompts")
    }

    /// `prompts/get`.
    pub async fn get_prompt(&self, name: &str, arguments: Option<HashMap<String, String>>) -> Result<PromptResult, ProtocolError> {
        let mut params = serde_json::json!({ "name": name });
        if let Some(arguments) = arguments {
            params["arguments"] = serde_json::to_value(arguments).unwrap_or(Value::Null);
        }
        let value = self.session.send_request("prompts/get", Some(params), CancellationToken::new()).await?;
        decode(value)
    }

    /// `resources/list`.
    pub async fn list_resources(&self, cursor: Option<&str>) -> Result<(Vec<Resource>, Option<String>), ProtocolError> {
        let params = cursor.map(|c| serde_json::json!({ "cursor": c }));
        let value = self.session.send_request("resources/list", params, CancellationToken::new()).await?;
        decode_page(value, "resources")
    }

    /// `resources/templates/list`.
    pub async fn list_resource_templates(&self, cursor: Option<&str>) -> Result<(Vec<ResourceTemplate>, Option<String>), ProtocolError> {
        let params = cursor.map(|c| serde_json::json!({ "cursor": c }));
        let value = self.session.send_request("resources/templates/list", params, CancellationToken::new()).await?;
        decode_page(value, "resourceTemplates")
    }

    /// `resources/read`.
    pub async fn read_resource(&self, uri: &str) -> Result<ResourceResult, ProtocolError> {
        let params = serde_json::json!({ "uri": uri });
        let value = self.session.send_request("resources/read", Some(params), CancellationToken::new()).await?;
        decode(value)
    }

    /// `resources/subscribe`.
    pub async fn subscribe_resource(&self, uri: &str) -> Result<(), ProtocolError> {
        let params = serde_json::json!({ "uri": uri });
        self.session.send_request("resources/subscribe", Some(params), CancellationToken::new()).await?;
        Ok(())
    }

    /// `resources/unsubscribe`.
    pub async fn unsubscribe_resource(&self, uri: &str) -> Result<(), ProtocolError> {
        let params = serde_json::json!({ "uri": uri });
        self.session.send_request("resources/unsubscribe", Some(params), CancellationToken::new()).await?;
        Ok(())
    }

    /// `logging/setLevel`.
    pub async fn set_log_level(&self, level: crate::logging::LogLevel) -> Result<(), ProtocolError> {
        let params = serde_json::json!({ "level": level });
        self.session.send_request("logging/setLevel", Some(params), CancellationToken::new()).await?;
        Ok(())
    }

    /// Gracefully close the underlying session.
    pub async fn close(&self) {
        self.session.close().await;
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(value).map_err(|e| ProtocolError::with_message(ErrorCode::InternalError, format!("malformed response: {e}")))
}

fn decode_page<T: serde::de::DeserializeOwned>(value: Value, key: &str) -> Result<(Vec<T>, Option<String>), ProtocolError> {
    let items: Vec<T> = decode(value.get(key).cloned().unwrap_or(Value::Array(Vec::new())))?;
    let next_cursor = value.get("nextCursor").and_then(Value::as_str).map(str::to_string);
    Ok((items, next_cursor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ServerBuilder;
    use mcprt_types::ToolResult;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::{mpsc, Mutex as AsyncMutex};

    struct ChannelTransport {
        outbox: mpsc::Sender<mcprt_protocol::JsonRpcMessage>,
        inbox: AsyncMutex<mpsc::Receiver<mcprt_protocol::JsonRpcMessage>>,
        closed: AtomicBool,
    }

    #[async_trait::async_trait]
    impl mcprt_transport::Transport for ChannelTransport {
        fn state(&self) -> mcprt_transport::TransportState {
            if self.closed.load(Ordering::SeqCst) { mcprt_transport::TransportState::Closed } else { mcprt_transport::TransportState::Open }
        }
        fn capabilities(&self) -> mcprt_transport::TransportCapabilities {
            mcprt_transport::TransportCapabilities { resumable: false, server_initiated: true }
        }
        async fn send(&self, message: mcprt_protocol::JsonRpcMessage) -> mcprt_transport::TransportResult<()> {
            self.outbox.send(message).await.map_err(|_| mcprt_transport::TransportError::Closed(mcprt_transport::CloseDetails::default()))
        }
        async fn receive(&self) -> mcprt_transport::TransportResult<Option<mcprt_protocol::JsonRpcMessage>> {
            Ok(self.inbox.lock().await.recv().await)
        }
        async fn close(&self) -> mcprt_transport::TransportResult<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn wire_pair() -> (Arc<ChannelTransport>, Arc<ChannelTransport>) {
        let (a_tx, a_rx) = mpsc::channel(64);
        let (b_tx, b_rx) = mpsc::channel(64);
        let a = Arc::new(ChannelTransport { outbox: a_tx, inbox: AsyncMutex::new(b_rx), closed: AtomicBool::new(false) });
        let b = Arc::new(ChannelTransport { outbox: b_tx, inbox: AsyncMutex::new(a_rx), closed: AtomicBool::new(false) });
        (a, b)
    }

    #[tokio::test]
    async fn client_calls_tool_through_server() {
        let server = ServerBuilder::new("test-server", "0.1.0")
            .tool(Tool::new("double", "doubles a number"), |params: Option<Value>, _ctx| async move {
                let n = params.and_then(|p| p.get("n").and_then(Value::as_i64).map(|n| n * 2)).unwrap_or(0);
                Ok(ToolResult::text(n.to_string()))
            })
            .unwrap()
            .build();

        let (client_t, server_t) = wire_pair();
        let _server_session = server.spawn_session(server_t);
        let client = McpClient::connect(
            client_t,
            mcprt_types::SUPPORTED_PROTOCOL_VERSIONS,
            ClientCapabilities::default(),
            ClientInfo::new("test-client", "0.1.0"),
        )
        .await
        .unwrap();

        let (tools, _) = client.list_tools(None).await.unwrap();
        assert_eq!(tools[0].name, "double");

        let result = client.call_tool("double", Some(serde_json::json!({"n": 21}))).await.unwrap();
        assert_eq!(result.content[0], mcprt_types::Content::text("42"));
    }
}
