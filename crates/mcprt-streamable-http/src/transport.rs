//! The server-side half of the Streamable HTTP transport (spec §4.4): one
//! [`StreamableServerTransport`] per MCP session, fed by short-lived POSTs
//! and drained by the standing GET stream.
//!
//! Responses to a POST-originated request are routed back to that POST's
//! waiter by request id. Everything else a session emits — server-initiated
//! requests, and notifications such as `notifications/progress` that have
//! no id to route by — goes out over the standing GET stream, recorded in
//! the event store so a reconnecting client can replay it. A POST whose
//! handling involves server-initiated interleaving therefore still
//! completes correctly, but that interleaving surfaces on the standing GET
//! rather than inline in the POST's own response; see DESIGN.md.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::warn;

use mcprt_protocol::request_id::RequestId;
use mcprt_protocol::JsonRpcMessage;
use mcprt_transport::{CloseDetails, Transport, TransportCapabilities, TransportResult, TransportState};

use crate::event_store::{EventStore, StreamId, MAIN_STREAM};
use crate::session_id::SessionId;
use crate::sse::SseEvent;

/// Depth of the channel each POST waits on for its response (and any
/// same-stream pushes it happens to receive before that response arrives).
const PENDING_QUEUE_DEPTH: usize = 16;
/// Depth of the inbound queue feeding the session's reader loop.
const INBOUND_QUEUE_DEPTH: usize = 64;
/// Depth of the standing GET stream's outbound queue.
const MAIN_STREAM_QUEUE_DEPTH: usize = 256;

/// One MCP session's server-side transport, backed by HTTP request/response
/// cycles instead of a persistent socket.
pub struct StreamableServerTransport {
    session_id: SessionId,
    state: SyncMutex<TransportState>,
    inbound_tx: mpsc::Sender<JsonRpcMessage>,
    inbound_rx: AsyncMutex<mpsc::Receiver<JsonRpcMessage>>,
    pending: DashMap<RequestId, mpsc::Sender<JsonRpcMessage>>,
    main_stream: SyncMutex<Option<mpsc::Sender<SseEvent>>>,
    event_store: Arc<dyn EventStore>,
    negotiated_protocol_version: SyncMutex<Option<String>>,
}

impl StreamableServerTransport {
    /// Build a transport for a freshly assigned session id.
    #[must_use]
    pub fn new(session_id: SessionId, event_store: Arc<dyn EventStore>) -> Arc<Self> {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);
        Arc::new(Self {
            session_id,
            state: SyncMutex::new(TransportState::Open),
            inbound_tx,
            inbound_rx: AsyncMutex::new(inbound_rx),
            pending: DashMap::new(),
            main_stream: SyncMutex::new(None),
            event_store,
            negotiated_protocol_version: SyncMutex::new(None),
        })
    }

    /// This session's id, as sent in the `Mcp-Session-Id` header.
    #[must_use]
    pub fn mcp_session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// The protocol version negotiated at `initialize`, once known. The
    /// HTTP layer enforces that every later request's `MCP-Protocol-Version`
    /// header matches this.
    #[must_use]
    pub fn negotiated_protocol_version(&self) -> Option<String> {
        self.negotiated_protocol_version.lock().clone()
    }

    /// Record the negotiated protocol version, called once `initialize`
    /// completes.
    pub fn set_negotiated_protocol_version(&self, version: impl Into<String>) {
        *self.negotiated_protocol_version.lock() = Some(version.into());
    }

    /// Feed one inbound message (a POST body) to the session's reader loop.
    pub async fn feed_inbound(&self, message: JsonRpcMessage) -> Result<(), JsonRpcMessage> {
        self.inbound_tx.send(message).await.map_err(|e| e.0)
    }

    /// Register a waiter for the response to `id`, returning the receiving
    /// half of its collector channel. Call before feeding the request in,
    /// to avoid racing the response.
    pub fn register_pending(&self, id: RequestId) -> mpsc::Receiver<JsonRpcMessage> {
        let (tx, rx) = mpsc::channel(PENDING_QUEUE_DEPTH);
        self.pending.insert(id, tx);
        rx
    }

    /// Stop waiting for `id`'s response (e.g. the HTTP client disconnected).
    pub fn abandon_pending(&self, id: &RequestId) {
        self.pending.remove(id);
    }

    /// Attach a new standing GET stream, replacing any previous one.
    /// Replays stored events newer than `last_event_id` (if given and
    /// known) before the channel carries anything live.
    pub async fn attach_main_stream(&self, last_event_id: Option<&str>) -> mpsc::Receiver<SseEvent> {
        let (tx, rx) = mpsc::channel(MAIN_STREAM_QUEUE_DEPTH);
        if let Some(last_event_id) = last_event_id {
            let stream: StreamId = MAIN_STREAM.to_string();
            for stored in self.event_store.replay_after(&self.session_id, &stream, last_event_id).await {
                if let Ok(line) = stored.message.to_line() {
                    let _ = tx.send(SseEvent::with_id(stored.id, line)).await;
                }
            }
        }
        *self.main_stream.lock() = Some(tx);
        rx
    }

    /// Detach the standing GET stream (the client disconnected or the
    /// session closed).
    pub fn detach_main_stream(&self) {
        *self.main_stream.lock() = None;
    }

    async fn push_main(&self, message: JsonRpcMessage) {
        let stream: StreamId = MAIN_STREAM.to_string();
        let event_id = self.event_store.store(&self.session_id, &stream, message.clone()).await;
        let Some(tx) = self.main_stream.lock().clone() else {
            // No GET connected right now; the event store still remembers
            // it for the next reconnect that supplies `Last-Event-ID`.
            return;
        };
        let Ok(line) = message.to_line() else {
            warn!(target: "mcprt_streamable_http::transport", "failed to encode outbound message");
            return;
        };
        if tx.send(SseEvent::with_id(event_id, line)).await.is_err() {
            self.detach_main_stream();
        }
    }
}

#[async_trait]
impl Transport for StreamableServerTransport {
    fn state(&self) -> TransportState {
        *self.state.lock()
    }

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities { resumable: true, server_initiated: true }
    }

    fn session_id(&self) -> Option<String> {
        Some(self.session_id.as_str().to_string())
    }

    async fn send(&self, message: JsonRpcMessage) -> TransportResult<()> {
        if self.state() == TransportState::Closed {
            return Err(mcprt_transport::TransportError::Closed(CloseDetails::default()));
        }
        if let Some(id) = message.id()
            && let Some((_, tx)) = self.pending.remove(id) {
                let _ = tx.send(message).await;
                return Ok(());
            }
        self.push_main(message).await;
        Ok(())
    }

    async fn receive(&self) -> TransportResult<Option<JsonRpcMessage>> {
        let mut guard = self.inbound_rx.lock().await;
        Ok(guard.recv().await)
    }

    async fn close(&self) -> TransportResult<()> {
        *self.state.lock() = TransportState::Closing;
        self.pending.clear();
        self.detach_main_stream();
        self.event_store.drop_session(&self.session_id).await;
        *self.state.lock() = TransportState::Closed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::InMemoryEventStore;
    use mcprt_protocol::jsonrpc::JsonRpcResponse;
    use mcprt_protocol::JsonRpcNotification;

    fn store() -> Arc<dyn EventStore> {
        Arc::new(InMemoryEventStore::default())
    }

    #[tokio::test]
    async fn response_routes_to_its_pending_waiter() {
        let transport = StreamableServerTransport::new(SessionId::new(), store());
        let id = RequestId::Number(1);
        let mut waiter = transport.register_pending(id.clone());

        transport
            .send(JsonRpcMessage::Response(JsonRpcResponse::new(id, serde_json::json!({"ok": true}))))
            .await
            .unwrap();

        let received = waiter.recv().await.unwrap();
        assert!(matches!(received, JsonRpcMessage::Response(_)));
    }

    #[tokio::test]
    async fn unmatched_message_goes_to_main_stream() {
        let transport = StreamableServerTransport::new(SessionId::new(), store());
        let mut main_rx = transport.attach_main_stream(None).await;

        transport
            .send(JsonRpcMessage::Notification(JsonRpcNotification::new("notifications/progress", None)))
            .await
            .unwrap();

        let event = main_rx.recv().await.unwrap();
        assert!(event.data.contains("notifications/progress"));
    }

    #[tokio::test]
    async fn reconnect_replays_events_after_last_event_id() {
        let transport = StreamableServerTransport::new(SessionId::new(), store());
        let mut first = transport.attach_main_stream(None).await;
        transport
            .send(JsonRpcMessage::Notification(JsonRpcNotification::new("notifications/a", None)))
            .await
            .unwrap();
        let first_event = first.recv().await.unwrap();

        // Simulate reconnect: attach a new stream with Last-Event-ID.
        transport
            .send(JsonRpcMessage::Notification(JsonRpcNotification::new("notifications/b", None)))
            .await
            .unwrap();
        let mut replayed = transport.attach_main_stream(first_event.id.as_deref()).await;
        let replay_event = replayed.recv().await.unwrap();
        assert!(replay_event.data.contains("notifications/b"));
    }

    #[tokio::test]
    async fn feed_inbound_reaches_receive() {
        let transport = StreamableServerTransport::new(SessionId::new(), store());
        transport
            .feed_inbound(JsonRpcMessage::Notification(JsonRpcNotification::new("ping", None)))
            .await
            .unwrap();
        let received = transport.receive().await.unwrap();
        assert!(received.is_some());
    }

    #[tokio::test]
    async fn close_clears_pending_and_main_stream() {
        let transport = StreamableServerTransport::new(SessionId::new(), store());
        let _waiter = transport.register_pending(RequestId::Number(1));
        let _main = transport.attach_main_stream(None).await;
        transport.close().await.unwrap();
        assert_eq!(transport.state(), TransportState::Closed);
        assert!(transport.pending.is_empty());
    }
}
