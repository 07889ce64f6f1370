//! The session multiplexer (spec §4.5) and the initialization engine
//! (spec §4.6) layered directly on top of it.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use mcprt_protocol::jsonrpc::JsonRpcErrorResponse;
use mcprt_protocol::request_id::RequestIdAllocator;
use mcprt_protocol::{
    ClientCapabilities, ErrorCode, InitializeRequest, InitializeResult, JsonRpcError,
    JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, ProtocolError, RequestId,
};
use mcprt_transport::Transport;
use mcprt_types::ClientInfo;
#[cfg(test)]
use mcprt_types::ServerInfo;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::context::{PeerHandle, RequestContext};
use crate::handler::{Filter, FilterChain, NotificationHandler, RequestHandler};
use crate::types::{Role, ServerInitConfig, SessionState};

/// Default timeout for an outbound request (spec §4.5).
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// Timeout for the `initialize` handshake specifically (spec §4.5).
const INITIALIZE_TIMEOUT: Duration = Duration::from_secs(120);
/// Bound on the outbound write queue; producers observe this as backpressure.
const WRITE_QUEUE_DEPTH: usize = 256;

struct MethodNotFoundHandler;

#[async_trait::async_trait]
impl RequestHandler for MethodNotFoundHandler {
    async fn handle(&self, _params: Option<Value>, _ctx: RequestContext) -> Result<Value, ProtocolError> {
        Err(ProtocolError::from_code(ErrorCode::MethodNotFound))
    }
}

/// A bidirectional JSON-RPC session running over one [`Transport`]: id
/// allocation, request/response correlation, cancellation, the
/// initialization handshake, and dispatch to registered handlers.
pub struct Session {
    transport: Arc<dyn Transport>,
    role: Role,
    state: Mutex<SessionState>,
    id_alloc: RequestIdAllocator,
    pending_outbound: DashMap<RequestId, oneshot::Sender<Result<Value, ProtocolError>>>,
    in_flight_inbound: DashMap<RequestId, CancellationToken>,
    request_handlers: DashMap<String, Arc<dyn RequestHandler>>,
    notification_handlers: DashMap<String, Vec<Arc<dyn NotificationHandler>>>,
    filters: RwLock<FilterChain>,
    write_tx: mpsc::Sender<JsonRpcMessage>,
    negotiated_version: Mutex<Option<String>>,
    peer_capabilities: Mutex<Option<Value>>,
    session_id: Mutex<Option<String>>,
    server_init: Option<ServerInitConfig>,
}

impl Session {
    /// Wrap a transport in a running session: spawns the single reader loop
    /// and the single writer loop. `server_init` is `Some` only for the
    /// server role, and supplies everything the built-in `initialize`
    /// handler needs to answer the handshake.
    #[must_use]
    pub fn spawn(transport: Arc<dyn Transport>, role: Role, server_init: Option<ServerInitConfig>) -> Arc<Self> {
        let (write_tx, write_rx) = mpsc::channel(WRITE_QUEUE_DEPTH);
        let session = Arc::new(Self {
            transport: transport.clone(),
            role,
            state: Mutex::new(SessionState::PreInit),
            id_alloc: RequestIdAllocator::new(),
            pending_outbound: DashMap::new(),
            in_flight_inbound: DashMap::new(),
            request_handlers: DashMap::new(),
            notification_handlers: DashMap::new(),
            filters: RwLock::new(FilterChain::new()),
            write_tx,
            negotiated_version: Mutex::new(None),
            peer_capabilities: Mutex::new(None),
            session_id: Mutex::new(None),
            server_init,
        });

        tokio::spawn(run_writer(transport, write_rx));
        {
            let reader = session.clone();
            tokio::spawn(async move { reader.run_reader().await });
        }
        session
    }

    /// This session's current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock() = state;
    }

    /// Which role this session plays.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// The protocol version negotiated during `initialize`, once available.
    #[must_use]
    pub fn negotiated_version(&self) -> Option<String> {
        self.negotiated_version.lock().clone()
    }

    /// The peer's advertised capabilities, once `initialize` has completed.
    #[must_use]
    pub fn peer_capabilities(&self) -> Option<Value> {
        self.peer_capabilities.lock().clone()
    }

    /// The session id assigned during a server-side `initialize`, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.session_id.lock().clone()
    }

    /// Register the handler for one request method, replacing any existing
    /// registration.
    pub fn register_request_handler(&self, method: impl Into<String>, handler: Arc<dyn RequestHandler>) {
        self.request_handlers.insert(method.into(), handler);
    }

    /// Register a handler for one notification method. Multiple handlers
    /// per method are permitted and run in registration order.
    pub fn register_notification_handler(&self, method: impl Into<String>, handler: Arc<dyn NotificationHandler>) {
        self.notification_handlers.entry(method.into()).or_default().push(handler);
    }

    /// Add a filter layer. The most recently registered filter becomes the
    /// outermost wrapper around every request handler.
    pub fn register_filter(&self, filter: Arc<dyn Filter>) {
        self.filters.write().register(filter);
    }

    /// Send a request to the peer and await its result, honoring `cancel`.
    /// Uses the longer `initialize` timeout automatically for that method.
    pub async fn send_request(
        self: &Arc<Self>,
        method: &str,
        params: Option<Value>,
        cancel: CancellationToken,
    ) -> Result<Value, ProtocolError> {
        let timeout = if method == "initialize" { INITIALIZE_TIMEOUT } else { DEFAULT_REQUEST_TIMEOUT };
        self.send_request_with_timeout(method, params, cancel, timeout).await
    }

    /// Send a request with an explicit timeout.
    pub async fn send_request_with_timeout(
        self: &Arc<Self>,
        method: &str,
        params: Option<Value>,
        cancel: CancellationToken,
        timeout: Duration,
    ) -> Result<Value, ProtocolError> {
        if self.state() == SessionState::Closed {
            return Err(ProtocolError::TransportClosed);
        }

        let id = self.id_alloc.next();
        let (tx, rx) = oneshot::channel();
        self.pending_outbound.insert(id.clone(), tx);
        let request = JsonRpcRequest::new(id.clone(), method, params);
        if let Err(e) = self.enqueue(JsonRpcMessage::Request(request)).await {
            self.pending_outbound.remove(&id);
            return Err(e);
        }

        tokio::pin!(rx);
        let sleep = tokio::time::sleep(timeout);
        tokio::pin!(sleep);
        let mut cancelling = false;

        loop {
            tokio::select! {
                _ = cancel.cancelled(), if !cancelling => {
                    cancelling = true;
                    self.emit_cancelled(&id).await;
                }
                _ = &mut sleep, if !cancelling => {
                    cancelling = true;
                    self.emit_cancelled(&id).await;
                }
                result = &mut rx => {
                    self.pending_outbound.remove(&id);
                    return match result {
                        Ok(_inner) if cancelling => Err(ProtocolError::from_code(ErrorCode::Cancelled)),
                        Ok(inner) => inner,
                        Err(_) => Err(ProtocolError::TransportClosed),
                    };
                }
            }
        }
    }

    async fn emit_cancelled(&self, id: &RequestId) {
        let payload = serde_json::json!({ "requestId": id });
        let notif = JsonRpcNotification::new("notifications/cancelled", Some(payload));
        let _ = self.enqueue(JsonRpcMessage::Notification(notif)).await;
    }

    /// Send a one-way notification to the peer.
    pub async fn send_notification(&self, method: &str, params: Option<Value>) -> Result<(), ProtocolError> {
        let notif = JsonRpcNotification::new(method, params);
        self.enqueue(JsonRpcMessage::Notification(notif)).await
    }

    async fn enqueue(&self, message: JsonRpcMessage) -> Result<(), ProtocolError> {
        self.write_tx.send(message).await.map_err(|_| ProtocolError::TransportClosed)
    }

    /// Client-side initialization (spec §4.6): issue `initialize`, validate
    /// the negotiated version is one the client actually supports, then
    /// emit `notifications/initialized`.
    pub async fn initialize_as_client(
        self: &Arc<Self>,
        supported_versions: &[&str],
        capabilities: ClientCapabilities,
        client_info: ClientInfo,
    ) -> Result<InitializeResult, ProtocolError> {
        self.set_state(SessionState::Initializing);
        let preferred = supported_versions.first().copied().unwrap_or_default();
        let params = serde_json::to_value(InitializeRequest {
            protocol_version: preferred.to_string(),
            capabilities,
            client_info,
        })
        .map_err(|e| ProtocolError::with_message(ErrorCode::InvalidParams, e.to_string()))?;

        let value = self.send_request("initialize", Some(params), CancellationToken::new()).await?;
        let result: InitializeResult = serde_json::from_value(value).map_err(|e| {
            ProtocolError::with_message(ErrorCode::InternalError, format!("malformed initialize result: {e}"))
        })?;

        if !supported_versions.contains(&result.protocol_version.as_str()) {
            self.set_state(SessionState::Closing);
            let _ = self.transport.close().await;
            self.set_state(SessionState::Closed);
            return Err(ProtocolError::with_message(
                ErrorCode::InvalidRequest,
                format!("server negotiated unsupported protocol version {}", result.protocol_version),
            ));
        }

        *self.negotiated_version.lock() = Some(result.protocol_version.clone());
        *self.peer_capabilities.lock() = Some(serde_json::to_value(&result.capabilities).unwrap_or(Value::Null));
        self.send_notification("notifications/initialized", None).await?;
        self.set_state(SessionState::Initialized);
        Ok(result)
    }

    /// Gracefully close the session: closes the transport and fails any
    /// outstanding work.
    pub async fn close(self: &Arc<Self>) {
        self.set_state(SessionState::Closing);
        let _ = self.transport.close().await;
        self.shutdown();
    }

    fn shutdown(&self) {
        self.set_state(SessionState::Closed);
        let stuck: Vec<RequestId> = self.pending_outbound.iter().map(|e| e.key().clone()).collect();
        for id in stuck {
            if let Some((_, tx)) = self.pending_outbound.remove(&id) {
                let _ = tx.send(Err(ProtocolError::TransportClosed));
            }
        }
        for entry in self.in_flight_inbound.iter() {
            entry.value().cancel();
        }
    }

    async fn run_reader(self: Arc<Self>) {
        loop {
            match self.transport.receive().await {
                Ok(Some(message)) => self.dispatch(message).await,
                Ok(None) => {
                    tracing::debug!("transport drained cleanly, closing session");
                    self.shutdown();
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "transport receive failed, closing session");
                    self.shutdown();
                    break;
                }
            }
        }
    }

    async fn dispatch(self: &Arc<Self>, message: JsonRpcMessage) {
        match message {
            JsonRpcMessage::Response(resp) => {
                if let Some((_, tx)) = self.pending_outbound.remove(&resp.id) {
                    let _ = tx.send(Ok(resp.result));
                } else {
                    tracing::warn!(id = %resp.id, "dropping response with no matching pending request");
                }
            }
            JsonRpcMessage::Error(err) => {
                if let Some((_, tx)) = self.pending_outbound.remove(&err.id) {
                    let _ = tx.send(Err(ProtocolError::Rpc {
                        code: code_from_wire(err.error.code),
                        message: err.error.message,
                        data: err.error.data,
                    }));
                } else {
                    tracing::warn!(id = %err.id, "dropping error response with no matching pending request");
                }
            }
            JsonRpcMessage::Notification(n) => self.dispatch_notification(n).await,
            JsonRpcMessage::Request(req) => self.dispatch_request(req).await,
        }
    }

    async fn dispatch_notification(self: &Arc<Self>, n: JsonRpcNotification) {
        if n.method == "notifications/cancelled" {
            if let Some(id) = n
                .params
                .as_ref()
                .and_then(|v| v.get("requestId"))
                .and_then(|v| serde_json::from_value::<RequestId>(v.clone()).ok())
                && let Some(token) = self.in_flight_inbound.get(&id)
            {
                token.cancel();
            }
            return;
        }

        if n.method == "notifications/initialized" {
            if self.role == Role::Server {
                self.set_state(SessionState::Initialized);
            }
            return;
        }

        let handlers = self.notification_handlers.get(&n.method).map(|e| e.value().clone());
        if let Some(handlers) = handlers {
            for handler in handlers {
                if let Err(e) = handler.handle(n.params.clone()).await {
                    tracing::warn!(method = %n.method, error = %e, "notification handler failed");
                }
            }
        }
    }

    async fn dispatch_request(self: &Arc<Self>, req: JsonRpcRequest) {
        if req.method == "ping" {
            self.respond_ok(req.id, serde_json::json!({})).await;
            return;
        }
        if req.method == "initialize" {
            self.handle_initialize(req).await;
            return;
        }
        if self.state() != SessionState::Initialized {
            self.respond_err(
                req.id,
                ErrorCode::InvalidRequest,
                "request received before the session finished initializing".to_string(),
                None,
            )
            .await;
            return;
        }

        let base = self
            .request_handlers
            .get(&req.method)
            .map(|e| e.value().clone())
            .unwrap_or_else(|| Arc::new(MethodNotFoundHandler) as Arc<dyn RequestHandler>);
        let handler = self.filters.read().apply(base);

        let token = CancellationToken::new();
        self.in_flight_inbound.insert(req.id.clone(), token.clone());

        let progress_token = req
            .params
            .as_ref()
            .and_then(|v| v.get("_meta"))
            .and_then(|m| m.get("progressToken"))
            .cloned();
        let peer = PeerHandle::new(self.clone(), token.clone());
        let ctx = RequestContext::new(token, progress_token, peer, None);

        let session = self.clone();
        let id = req.id.clone();
        let params = req.params;
        tokio::spawn(async move {
            let result = handler.handle(params, ctx).await;
            session.in_flight_inbound.remove(&id);
            session.respond_result(id, result).await;
        });
    }

    async fn handle_initialize(self: &Arc<Self>, req: JsonRpcRequest) {
        let Some(config) = self.server_init.clone() else {
            self.respond_err(
                req.id,
                ErrorCode::MethodNotFound,
                "this session has no server-side initialize handler".to_string(),
                None,
            )
            .await;
            return;
        };

        let params: InitializeRequest = match req.params.clone() {
            Some(v) => match serde_json::from_value(v) {
                Ok(p) => p,
                Err(e) => {
                    self.respond_err(req.id, ErrorCode::InvalidParams, format!("bad initialize params: {e}"), None)
                        .await;
                    return;
                }
            },
            None => {
                self.respond_err(req.id, ErrorCode::InvalidParams, "missing initialize params".to_string(), None)
                    .await;
                return;
            }
        };

        let supported: Vec<&str> = config.supported_versions.iter().map(String::as_str).collect();
        let negotiated = mcprt_protocol::initialize::negotiate_version(&params.protocol_version, &supported);

        *self.peer_capabilities.lock() = Some(serde_json::to_value(&params.capabilities).unwrap_or(Value::Null));
        *self.negotiated_version.lock() = Some(negotiated.clone());
        if self.session_id.lock().is_none() {
            *self.session_id.lock() = Some(format!("mcprt-{}", uuid::Uuid::new_v4()));
        }
        self.set_state(SessionState::Initializing);

        let mut result = InitializeResult::new(negotiated, config.capabilities.clone(), config.server_info.clone());
        if let Some(instructions) = &config.instructions {
            result = result.with_instructions(instructions.clone());
        }
        let value = serde_json::to_value(&result).unwrap_or(Value::Null);
        self.respond_ok(req.id, value).await;
    }

    async fn respond_ok(&self, id: RequestId, value: Value) {
        let _ = self.enqueue(JsonRpcMessage::Response(JsonRpcResponse::new(id, value))).await;
    }

    async fn respond_err(&self, id: RequestId, code: ErrorCode, message: String, data: Option<Value>) {
        let error = JsonRpcError { code: code.code(), message, data };
        let _ = self.enqueue(JsonRpcMessage::Error(JsonRpcErrorResponse::new(id, error))).await;
    }

    async fn respond_result(&self, id: RequestId, result: Result<Value, ProtocolError>) {
        match result {
            Ok(value) => self.respond_ok(id, value).await,
            Err(ProtocolError::Rpc { code, message, data }) => self.respond_err(id, code, message, data).await,
            Err(ProtocolError::TransportClosed | ProtocolError::ShuttingDown) => {}
        }
    }
}

async fn run_writer(transport: Arc<dyn Transport>, mut rx: mpsc::Receiver<JsonRpcMessage>) {
    while let Some(message) = rx.recv().await {
        if let Err(e) = transport.send(message).await {
            tracing::warn!(error = %e, "transport send failed, stopping writer");
            break;
        }
    }
}

/// Maps a wire error code back to our closed [`ErrorCode`] set. Codes
/// outside the standard set (e.g. application-defined codes) collapse to
/// `InternalError`; the original message and data are preserved regardless.
fn code_from_wire(code: i32) -> ErrorCode {
    match code {
        -32700 => ErrorCode::ParseError,
        -32600 => ErrorCode::InvalidRequest,
        -32601 => ErrorCode::MethodNotFound,
        -32602 => ErrorCode::InvalidParams,
        -32800 => ErrorCode::Cancelled,
        _ => ErrorCode::InternalError,
    }
}
