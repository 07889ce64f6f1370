//! The reqwest-based client side of the Streamable HTTP transport (spec
//! §4.4): POSTs carry outbound messages, a standing GET drains
//! server-initiated traffic, and a `401` triggers one credential-provider
//! retry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex as SyncMutex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode, Url};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use mcprt_protocol::jsonrpc::{JsonRpcError, JsonRpcErrorResponse};
use mcprt_protocol::request_id::RequestId;
use mcprt_protocol::JsonRpcMessage;
use mcprt_transport::{CloseDetails, Transport, TransportCapabilities, TransportError, TransportResult, TransportState};

use crate::auth::{AuthChallenge, CredentialProvider, NoCredentials};
use crate::server::{LAST_EVENT_ID, MCP_PROTOCOL_VERSION, MCP_SESSION_ID};
use crate::session_id::SessionId;
use crate::sse::SseDecoder;

const INBOUND_QUEUE_DEPTH: usize = 64;
/// Delay between standing-GET reconnect attempts after a stream drops.
const GET_RECONNECT_DELAY: Duration = Duration::from_millis(200);

struct ClientState {
    session_id: SyncMutex<Option<SessionId>>,
    protocol_version: SyncMutex<Option<String>>,
    state: SyncMutex<TransportState>,
    http: Client,
    base_url: Url,
    credentials: Arc<dyn CredentialProvider>,
    inbound_tx: mpsc::Sender<JsonRpcMessage>,
    last_main_event_id: SyncMutex<Option<String>>,
}

/// One MCP session's client-side transport, talking to a
/// [`crate::server::StreamableHttpServer`] (or any compliant server) over
/// HTTP.
pub struct StreamableHttpClientTransport {
    inner: Arc<ClientState>,
    inbound_rx: AsyncMutex<mpsc::Receiver<JsonRpcMessage>>,
    get_task: AsyncMutex<Option<JoinHandle<()>>>,
}

impl StreamableHttpClientTransport {
    /// Connect to a server at `base_url` with no authentication.
    #[must_use]
    pub fn new(base_url: Url) -> Arc<Self> {
        Self::with_credentials(base_url, Arc::new(NoCredentials))
    }

    /// Connect to a server at `base_url`, retrying a `401` once using
    /// `credentials`.
    #[must_use]
    pub fn with_credentials(base_url: Url, credentials: Arc<dyn CredentialProvider>) -> Arc<Self> {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);
        let inner = Arc::new(ClientState {
            session_id: SyncMutex::new(None),
            protocol_version: SyncMutex::new(None),
            state: SyncMutex::new(TransportState::Open),
            http: Client::new(),
            base_url,
            credentials,
            inbound_tx,
            last_main_event_id: SyncMutex::new(None),
        });
        let transport = Arc::new(Self {
            inner: inner.clone(),
            inbound_rx: AsyncMutex::new(inbound_rx),
            get_task: AsyncMutex::new(None),
        });
        let handle = tokio::spawn(standing_get_loop(inner));
        // The task handle is stashed so `close` can abort it; this first
        // store always succeeds since nothing else has run yet.
        if let Ok(mut guard) = transport.get_task.try_lock() {
            *guard = Some(handle);
        }
        transport
    }

    /// The session id assigned by the server, once `initialize` completes.
    #[must_use]
    pub fn mcp_session_id(&self) -> Option<SessionId> {
        self.inner.session_id.lock().clone()
    }

    /// Record the protocol version negotiated at `initialize`, enabling the
    /// `MCP-Protocol-Version` header on every request after it.
    pub fn set_negotiated_protocol_version(&self, version: impl Into<String>) {
        *self.inner.protocol_version.lock() = Some(version.into());
    }
}

async fn post_with_retry(
    inner: &ClientState,
    body: String,
) -> Result<reqwest::Response, reqwest::Error> {
    let send_once = |auth: Option<String>| {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/event-stream"));
        if let Some(session_id) = inner.session_id.lock().clone()
            && let Ok(v) = HeaderValue::from_str(session_id.as_str()) {
                headers.insert(MCP_SESSION_ID, v);
            }
        if let Some(version) = inner.protocol_version.lock().clone()
            && let Ok(v) = HeaderValue::from_str(&version) {
                headers.insert(MCP_PROTOCOL_VERSION, v);
            }
        if let Some(auth) = auth
            && let Ok(v) = HeaderValue::from_str(&auth) {
                headers.insert(AUTHORIZATION, v);
            }
        inner.http.post(inner.base_url.clone()).headers(headers).body(body.clone()).send()
    };

    let response = send_once(None).await?;
    if response.status() != StatusCode::UNAUTHORIZED {
        return Ok(response);
    }

    let challenge = response
        .headers()
        .get(reqwest::header::WWW_AUTHENTICATE)
        .and_then(|v| v.to_str().ok())
        .map(AuthChallenge::parse)
        .unwrap_or_default();
    let Some(auth) = inner.credentials.authorization_for(&challenge).await else {
        return Ok(response);
    };
    send_once(Some(auth)).await
}

fn internal_error_for(id: &RequestId, message: impl Into<String>) -> JsonRpcMessage {
    JsonRpcMessage::Error(JsonRpcErrorResponse::new(
        id.clone(),
        JsonRpcError { code: -32603, message: message.into(), data: None },
    ))
}

async fn deliver_post_response(
    inner: &Arc<ClientState>,
    response: reqwest::Response,
    request_id: Option<RequestId>,
    is_initialize: bool,
) {
    let status = response.status();
    if status == StatusCode::ACCEPTED || status == StatusCode::NO_CONTENT {
        return;
    }
    if !status.is_success() {
        if let Some(id) = request_id {
            let _ = inner.inbound_tx.send(internal_error_for(&id, format!("HTTP {status}"))).await;
        }
        return;
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if content_type.contains("text/event-stream") {
        let mut decoder = SseDecoder::new();
        let mut stream = response;
        while let Some(chunk) = stream.chunk().await.unwrap_or(None) {
            for event in decoder.feed(&chunk) {
                if let Ok(message) = JsonRpcMessage::from_str(&event.data) {
                    capture_negotiated_version(inner, is_initialize, &message);
                    let _ = inner.inbound_tx.send(message).await;
                }
            }
        }
        return;
    }

    match response.text().await {
        Ok(text) => {
            if let Ok(message) = JsonRpcMessage::from_str(&text) {
                capture_negotiated_version(inner, is_initialize, &message);
                let _ = inner.inbound_tx.send(message).await;
            }
        }
        Err(err) => {
            if let Some(id) = request_id {
                let _ = inner.inbound_tx.send(internal_error_for(&id, err.to_string())).await;
            }
        }
    }
}

/// The `initialize` response carries the protocol version the server
/// negotiated; every POST after it must echo that back in
/// `MCP-Protocol-Version`, so the client remembers it here rather than
/// requiring the session layer to know about a transport-specific setter.
fn capture_negotiated_version(inner: &Arc<ClientState>, is_initialize: bool, message: &JsonRpcMessage) {
    if !is_initialize {
        return;
    }
    if let JsonRpcMessage::Response(resp) = message
        && let Some(version) = resp.result.get("protocolVersion").and_then(|v| v.as_str())
    {
        *inner.protocol_version.lock() = Some(version.to_string());
    }
}

async fn standing_get_loop(inner: Arc<ClientState>) {
    loop {
        if *inner.state.lock() == TransportState::Closed {
            return;
        }
        let Some(session_id) = inner.session_id.lock().clone() else {
            tokio::time::sleep(GET_RECONNECT_DELAY).await;
            continue;
        };

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        if let Ok(v) = HeaderValue::from_str(session_id.as_str()) {
            headers.insert(MCP_SESSION_ID, v);
        }
        if let Some(last_id) = inner.last_main_event_id.lock().clone()
            && let Ok(v) = HeaderValue::from_str(&last_id) {
                headers.insert(LAST_EVENT_ID, v);
            }

        match inner.http.get(inner.base_url.clone()).headers(headers).send().await {
            Ok(response) if response.status().is_success() => {
                let mut decoder = SseDecoder::new();
                let mut response = response;
                loop {
                    match response.chunk().await {
                        Ok(Some(chunk)) => {
                            for event in decoder.feed(&chunk) {
                                if let Some(id) = &event.id {
                                    *inner.last_main_event_id.lock() = Some(id.clone());
                                }
                                if let Ok(message) = JsonRpcMessage::from_str(&event.data) {
                                    let _ = inner.inbound_tx.send(message).await;
                                }
                            }
                        }
                        Ok(None) => break,
                        Err(err) => {
                            debug!(target: "mcprt_streamable_http::client", %err, "standing GET stream error");
                            break;
                        }
                    }
                }
            }
            Ok(response) => {
                warn!(target: "mcprt_streamable_http::client", status = %response.status(), "standing GET rejected");
            }
            Err(err) => {
                debug!(target: "mcprt_streamable_http::client", %err, "standing GET connect failed");
            }
        }
        tokio::time::sleep(GET_RECONNECT_DELAY).await;
    }
}

#[async_trait]
impl Transport for StreamableHttpClientTransport {
    fn state(&self) -> TransportState {
        *self.inner.state.lock()
    }

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities { resumable: true, server_initiated: true }
    }

    fn session_id(&self) -> Option<String> {
        self.inner.session_id.lock().as_ref().map(|id| id.as_str().to_string())
    }

    async fn send(&self, message: JsonRpcMessage) -> TransportResult<()> {
        if self.state() == TransportState::Closed {
            return Err(TransportError::Closed(CloseDetails::default()));
        }
        let is_initialize = matches!(&message, JsonRpcMessage::Request(r) if r.method == "initialize");
        let request_id = message.id().cloned();
        let body = message
            .to_line()
            .map_err(|e| TransportError::Codec(mcprt_protocol::jsonrpc::ParseError::Json(e)))?;

        let inner = self.inner.clone();
        tokio::spawn(async move {
            match post_with_retry(&inner, body).await {
                Ok(response) => {
                    if is_initialize
                        && let Some(session_id) =
                            response.headers().get(MCP_SESSION_ID).and_then(|v| v.to_str().ok())
                            && let Some(parsed) = SessionId::parse(session_id) {
                                *inner.session_id.lock() = Some(parsed);
                            }
                    deliver_post_response(&inner, response, request_id, is_initialize).await;
                }
                Err(err) => {
                    if let Some(id) = request_id {
                        let _ = inner.inbound_tx.send(internal_error_for(&id, err.to_string())).await;
                    }
                }
            }
        });
        Ok(())
    }

    async fn receive(&self) -> TransportResult<Option<JsonRpcMessage>> {
        let mut guard = self.inbound_rx.lock().await;
        Ok(guard.recv().await)
    }

    async fn close(&self) -> TransportResult<()> {
        *self.inner.state.lock() = TransportState::Closing;
        if let Some(handle) = self.get_task.lock().await.take() {
            handle.abort();
        }
        let session_id = self.inner.session_id.lock().clone();
        if let Some(session_id) = session_id {
            let mut headers = HeaderMap::new();
            if let Ok(v) = HeaderValue::from_str(session_id.as_str()) {
                headers.insert(MCP_SESSION_ID, v);
            }
            let _ = self.inner.http.delete(self.inner.base_url.clone()).headers(headers).send().await;
        }
        *self.inner.state.lock() = TransportState::Closed;
        Ok(())
    }
}
