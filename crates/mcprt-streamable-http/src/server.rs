//! The axum-based server side of the Streamable HTTP transport (spec
//! §4.4): `POST /` for client-to-server traffic, `GET /` for the standing
//! server push stream, `DELETE /` to terminate a session.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::sse::{Event as AxumSseEvent, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use dashmap::DashMap;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::warn;

use mcprt_protocol::jsonrpc::ParseError;
use mcprt_protocol::JsonRpcMessage;
use mcprt_session::{Role, ServerInitConfig, Session};
use mcprt_transport::Transport;

use crate::event_store::{EventStore, InMemoryEventStore};
use crate::session_id::SessionId;
use crate::transport::StreamableServerTransport;

/// `Mcp-Session-Id` header name.
pub const MCP_SESSION_ID: &str = "mcp-session-id";
/// `MCP-Protocol-Version` header name.
pub const MCP_PROTOCOL_VERSION: &str = "mcp-protocol-version";
/// `Last-Event-ID` header name.
pub const LAST_EVENT_ID: &str = "last-event-id";

/// How long a POST waits for its response before giving up (spec §4.5's
/// default request timeout applies at the session layer; this is the HTTP
/// layer's own ceiling so a stuck handler doesn't hold a connection open
/// forever).
const POST_RESPONSE_TIMEOUT: Duration = Duration::from_secs(65);

/// Called once per freshly spawned session, letting the application
/// register request/notification handlers and filters before any traffic
/// but `initialize` is allowed through.
pub type SessionHook = Arc<dyn Fn(&Arc<Session>) + Send + Sync>;

/// Server-side Streamable HTTP endpoint: owns every live session's
/// transport and the shared event store behind it.
pub struct StreamableHttpServer {
    server_init: ServerInitConfig,
    sessions: DashMap<SessionId, (Arc<StreamableServerTransport>, Arc<Session>)>,
    event_store: Arc<dyn EventStore>,
    on_new_session: SessionHook,
    stateless: bool,
}

impl StreamableHttpServer {
    /// Build a stateful server: every `initialize` gets a persisted session
    /// id, and the standing GET stream is resumable.
    #[must_use]
    pub fn new(server_init: ServerInitConfig, on_new_session: SessionHook) -> Arc<Self> {
        Self::build(server_init, on_new_session, false)
    }

    /// Build a stateless server: no session id is assigned, and every POST
    /// must be self-contained (its own `initialize` included), since there
    /// is nowhere to resume a stream from. Only sound when this server's
    /// capabilities advertise no subscriptions.
    #[must_use]
    pub fn new_stateless(server_init: ServerInitConfig, on_new_session: SessionHook) -> Arc<Self> {
        Self::build(server_init, on_new_session, true)
    }

    fn build(server_init: ServerInitConfig, on_new_session: SessionHook, stateless: bool) -> Arc<Self> {
        Arc::new(Self {
            server_init,
            sessions: DashMap::new(),
            event_store: Arc::new(InMemoryEventStore::default()),
            on_new_session,
            stateless,
        })
    }

    /// Build the axum router serving this endpoint at its root path.
    #[must_use = "the router does nothing until served, e.g. with axum::serve"]
    pub fn router(self: Arc<Self>) -> Router {
        Router::new().route("/", get(handle_get).post(handle_post).delete(handle_delete)).with_state(self)
    }

    fn spawn_session(self: &Arc<Self>, session_id: SessionId) -> Arc<StreamableServerTransport> {
        let transport = StreamableServerTransport::new(session_id.clone(), self.event_store.clone());
        let session = Session::spawn(transport.clone(), Role::Server, Some(self.server_init.clone()));
        (self.on_new_session)(&session);
        self.sessions.insert(session_id, (transport.clone(), session));
        transport
    }

    fn lookup(&self, session_id: &SessionId) -> Option<(Arc<StreamableServerTransport>, Arc<Session>)> {
        self.sessions.get(session_id).map(|entry| entry.value().clone())
    }
}

fn session_id_header(headers: &HeaderMap) -> Option<SessionId> {
    headers.get(MCP_SESSION_ID).and_then(|v| v.to_str().ok()).and_then(SessionId::parse)
}

fn protocol_version_header(headers: &HeaderMap) -> Option<String> {
    headers.get(MCP_PROTOCOL_VERSION).and_then(|v| v.to_str().ok()).map(str::to_string)
}

fn accepts_sse(headers: &HeaderMap) -> bool {
    headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|a| a.contains("text/event-stream"))
}

fn accepts_json(headers: &HeaderMap) -> bool {
    headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_none_or(|a| a.contains("application/json") || a.contains("*/*"))
}

fn bad_request(message: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, message.into()).into_response()
}

fn with_session_header(mut response: Response, session_id: &SessionId) -> Response {
    if let Ok(value) = HeaderValue::from_str(session_id.as_str()) {
        response.headers_mut().insert(MCP_SESSION_ID, value);
    }
    response
}

async fn handle_post(
    State(server): State<Arc<StreamableHttpServer>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let text = match std::str::from_utf8(&body) {
        Ok(text) => text,
        Err(_) => return bad_request("request body is not valid UTF-8"),
    };
    let message = match JsonRpcMessage::from_str(text) {
        Ok(message) => message,
        Err(err) => return jsonrpc_parse_error_response(&err),
    };

    let existing_id = session_id_header(&headers);
    let is_initialize = matches!(&message, JsonRpcMessage::Request(r) if r.method == "initialize");

    let (transport, fresh) = match existing_id {
        Some(id) => match server.lookup(&id) {
            Some((transport, _session)) => (transport, false),
            None => return (StatusCode::NOT_FOUND, "unknown session").into_response(),
        },
        None if is_initialize && !server.stateless => {
            let transport = server.spawn_session(SessionId::new());
            (transport, true)
        }
        None if server.stateless => {
            // Stateless mode: an ephemeral, unregistered session per request.
            let transport = StreamableServerTransport::new(SessionId::new(), server.event_store.clone());
            let session = Session::spawn(transport.clone(), Role::Server, Some(server.server_init.clone()));
            (server.on_new_session)(&session);
            (transport, true)
        }
        None => {
            return bad_request("Mcp-Session-Id header required outside of initialize");
        }
    };

    if !fresh
        && let Some(expected) = transport.negotiated_protocol_version() {
            match protocol_version_header(&headers) {
                Some(got) if got == expected => {}
                _ => return bad_request("MCP-Protocol-Version header missing or mismatched"),
            }
        }

    match message {
        JsonRpcMessage::Notification(_) => {
            if transport.feed_inbound(message).await.is_err() {
                return (StatusCode::INTERNAL_SERVER_ERROR, "session closed").into_response();
            }
            StatusCode::ACCEPTED.into_response()
        }
        JsonRpcMessage::Request(ref req) => {
            let id = req.id.clone();
            let mut waiter = transport.register_pending(id.clone());
            if transport.feed_inbound(message).await.is_err() {
                transport.abandon_pending(&id);
                return (StatusCode::INTERNAL_SERVER_ERROR, "session closed").into_response();
            }

            let result = tokio::time::timeout(POST_RESPONSE_TIMEOUT, waiter.recv()).await;
            transport.abandon_pending(&id);
            let Ok(Some(reply)) = result else {
                return (StatusCode::GATEWAY_TIMEOUT, "no response from handler").into_response();
            };

            if fresh && is_initialize
                && let JsonRpcMessage::Response(resp) = &reply
                    && let Some(version) = resp.result.get("protocolVersion").and_then(|v| v.as_str()) {
                        transport.set_negotiated_protocol_version(version);
                    }

            let Ok(value) = reply.to_value() else {
                return (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode response").into_response();
            };

            let response = if accepts_json(&headers) {
                axum::Json(value).into_response()
            } else if accepts_sse(&headers) {
                let Ok(line) = reply.to_line() else {
                    return (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode response").into_response();
                };
                let event = AxumSseEvent::default().data(line);
                Sse::new(tokio_stream::once(Ok::<_, Infallible>(event))).into_response()
            } else {
                return (StatusCode::NOT_ACCEPTABLE, "Accept must allow application/json or text/event-stream")
                    .into_response();
            };

            if fresh && !server.stateless {
                with_session_header(response, transport.mcp_session_id())
            } else {
                response
            }
        }
        JsonRpcMessage::Response(_) | JsonRpcMessage::Error(_) => {
            bad_request("POST body must be a request or notification")
        }
    }
}

async fn handle_get(State(server): State<Arc<StreamableHttpServer>>, headers: HeaderMap) -> Response {
    let Some(session_id) = session_id_header(&headers) else {
        return bad_request("Mcp-Session-Id header required");
    };
    let Some((transport, _session)) = server.lookup(&session_id) else {
        return (StatusCode::NOT_FOUND, "unknown session").into_response();
    };

    let last_event_id = headers.get(LAST_EVENT_ID).and_then(|v| v.to_str().ok()).map(str::to_string);
    let rx = transport.attach_main_stream(last_event_id.as_deref()).await;
    let stream = ReceiverStream::new(rx).map(|event| {
        let mut axum_event = AxumSseEvent::default().data(event.data);
        if let Some(id) = event.id {
            axum_event = axum_event.id(id);
        }
        Ok::<_, Infallible>(axum_event)
    });
    Sse::new(stream).into_response()
}

async fn handle_delete(State(server): State<Arc<StreamableHttpServer>>, headers: HeaderMap) -> Response {
    let Some(session_id) = session_id_header(&headers) else {
        return bad_request("Mcp-Session-Id header required");
    };
    let Some((_, (transport, session))) = server.sessions.remove(&session_id) else {
        return (StatusCode::NOT_FOUND, "unknown session").into_response();
    };
    session.close().await;
    if let Err(err) = transport.close().await {
        warn!(target: "mcprt_streamable_http::server", %err, "error closing transport on DELETE");
    }
    StatusCode::NO_CONTENT.into_response()
}

fn jsonrpc_parse_error_response(err: &ParseError) -> Response {
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "id": null,
        "error": { "code": err.error_code(), "message": err.to_string() },
    });
    (StatusCode::BAD_REQUEST, axum::Json(body)).into_response()
}
