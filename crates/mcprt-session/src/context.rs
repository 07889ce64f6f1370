//! Request-scoped execution context and the peer callback handle
//! (spec §4.8).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use mcprt_protocol::ProtocolError;
use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::session::Session;

/// Issues server-to-client (or client-to-server) calls from within a running
/// handler, reusing the same multiplexer and cancellation linkage as the
/// inbound request that spawned it.
#[derive(Clone)]
pub struct PeerHandle {
    session: Option<Arc<Session>>,
    cancel: CancellationToken,
}

impl PeerHandle {
    pub(crate) fn new(session: Arc<Session>, cancel: CancellationToken) -> Self {
        Self { session: Some(session), cancel }
    }

    /// A handle with no live session behind it; every call fails with
    /// [`ProtocolError::TransportClosed`]. Used for transports that never
    /// support peer-initiated calls.
    #[must_use]
    pub fn disconnected() -> Self {
        Self { session: None, cancel: CancellationToken::new() }
    }

    /// Issue a peer request and await its result.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, ProtocolError> {
        let session = self.session.as_ref().ok_or(ProtocolError::TransportClosed)?;
        session.send_request(method, params, self.cancel.child_token()).await
    }

    /// Send a one-way notification to the peer.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), ProtocolError> {
        let session = self.session.as_ref().ok_or(ProtocolError::TransportClosed)?;
        session.send_notification(method, params).await
    }
}

/// The execution context a handler runs inside (spec §4.8): cancellation,
/// progress reporting, a peer callback handle, and request-scoped
/// key-value state.
#[derive(Clone)]
pub struct RequestContext {
    cancellation: CancellationToken,
    progress_token: Option<Value>,
    last_progress: Arc<AtomicU64>,
    peer: PeerHandle,
    principal: Option<String>,
    scope: Arc<Mutex<HashMap<String, Value>>>,
}

impl RequestContext {
    pub(crate) fn new(
        cancellation: CancellationToken,
        progress_token: Option<Value>,
        peer: PeerHandle,
        principal: Option<String>,
    ) -> Self {
        Self {
            cancellation,
            progress_token,
            last_progress: Arc::new(AtomicU64::new(0)),
            peer,
            principal,
            scope: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Build a context outside of a live dispatch loop, for unit tests.
    #[must_use]
    pub fn for_test(peer: PeerHandle) -> Self {
        Self::new(CancellationToken::new(), None, peer, None)
    }

    /// The token tied to this request's cancellation: fired if the peer
    /// sends `notifications/cancelled` for this request id, or if the
    /// session closes.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether this request has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// The progress token from the inbound request's `params._meta.progressToken`,
    /// if the caller asked for progress updates.
    #[must_use]
    pub fn progress_token(&self) -> Option<&Value> {
        self.progress_token.as_ref()
    }

    /// Report progress. A no-op if the caller supplied no progress token.
    /// Regressions (`progress` less than the last reported value) are
    /// clamped to the last value rather than rejected.
    pub async fn report_progress(&self, progress: f64, total: Option<f64>) -> Result<(), ProtocolError> {
        let Some(token) = self.progress_token.clone() else {
            return Ok(());
        };
        let clamped = loop {
            let prev_bits = self.last_progress.load(Ordering::SeqCst);
            let prev = f64::from_bits(prev_bits);
            let clamped = progress.max(prev);
            if self
                .last_progress
                .compare_exchange(prev_bits, clamped.to_bits(), Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                break clamped;
            }
        };

        let mut payload = serde_json::json!({
            "progressToken": token,
            "progress": clamped,
        });
        if let Some(total) = total {
            payload["total"] = serde_json::json!(total);
        }
        self.peer.notify("notifications/progress", Some(payload)).await
    }

    /// The peer callback handle for server-to-client (or client-to-server)
    /// requests and notifications.
    #[must_use]
    pub fn peer(&self) -> &PeerHandle {
        &self.peer
    }

    /// An opaque identity principal, if the transport authenticated one.
    #[must_use]
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// Store a request-scoped value.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.scope.lock().insert(key.into(), value);
    }

    /// Read a request-scoped value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.scope.lock().get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn progress_with_no_token_is_a_noop() {
        let ctx = RequestContext::for_test(PeerHandle::disconnected());
        assert!(ctx.report_progress(5.0, None).await.is_ok());
    }

    #[test]
    fn scope_roundtrips() {
        let ctx = RequestContext::for_test(PeerHandle::disconnected());
        ctx.set("k", Value::from(42));
        assert_eq!(ctx.get("k"), Some(Value::from(42)));
        assert_eq!(ctx.get("missing"), None);
    }

    #[test]
    fn cancellation_reflects_token_state() {
        let ctx = RequestContext::for_test(PeerHandle::disconnected());
        assert!(!ctx.is_cancelled());
        ctx.cancellation_token().cancel();
        assert!(ctx.is_cancelled());
    }
}
