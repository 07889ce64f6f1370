//! The resumable event store contract (spec §4.4): every message pushed
//! down a server-initiated SSE stream is recorded under its
//! `(sessionId, streamId)` so a reconnecting client can replay everything
//! it missed by sending `Last-Event-ID`.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use mcprt_protocol::JsonRpcMessage;

use crate::session_id::SessionId;

/// Identifies one logical SSE stream within a session: either the standing
/// GET stream (`"main"`), or the event-stream response to a specific POST.
pub type StreamId = String;

/// The standing GET stream's identifier.
pub const MAIN_STREAM: &str = "main";

/// A message recorded for replay, alongside its assigned event id.
#[derive(Clone, Debug)]
pub struct StoredEvent {
    /// Strictly-monotonic id within its `(sessionId, streamId)`.
    pub id: String,
    /// The recorded message.
    pub message: JsonRpcMessage,
}

/// Pluggable storage for resumable SSE streams.
///
/// Implementations may drop events after a TTL; a client that reconnects
/// too late simply misses them (the spec treats this as acceptable
/// degradation, not a protocol violation).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Record `message` under `(session, stream)` and return its assigned
    /// event id. Ids are strictly increasing within one `(session, stream)`
    /// pair, never reused.
    async fn store(
        &self,
        session: &SessionId,
        stream: &StreamId,
        message: JsonRpcMessage,
    ) -> String;

    /// Return every event recorded after `last_event_id` for this
    /// `(session, stream)`, oldest first. Returns an empty vector if
    /// `last_event_id` is unknown (already dropped, or never issued) —
    /// the caller falls back to a fresh live stream with no replay.
    async fn replay_after(
        &self,
        session: &SessionId,
        stream: &StreamId,
        last_event_id: &str,
    ) -> Vec<StoredEvent>;

    /// Drop all state for a terminated session.
    async fn drop_session(&self, session: &SessionId);
}

struct Ledger {
    next_seq: u64,
    events: VecDeque<(u64, StoredEvent, Instant)>,
}

impl Ledger {
    fn new() -> Self {
        Self { next_seq: 1, events: VecDeque::new() }
    }
}

/// An in-process event store backed by a bounded, TTL-expiring ledger per
/// stream. Suitable for a single-process deployment; a production
/// multi-instance deployment would swap this for a shared backend behind
/// the same trait.
pub struct InMemoryEventStore {
    ledgers: DashMap<(SessionId, StreamId), Mutex<Ledger>>,
    ttl: Duration,
    max_per_stream: usize,
}

impl InMemoryEventStore {
    /// Build a store that keeps at most `max_per_stream` events per stream
    /// and drops anything older than `ttl` on access.
    #[must_use]
    pub fn new(ttl: Duration, max_per_stream: usize) -> Self {
        Self { ledgers: DashMap::new(), ttl, max_per_stream }
    }

    fn evict_expired(&self, ledger: &mut Ledger) {
        let cutoff = Instant::now().checked_sub(self.ttl);
        if let Some(cutoff) = cutoff {
            while let Some((_, _, stamped)) = ledger.events.front() {
                if *stamped < cutoff {
                    ledger.events.pop_front();
                } else {
                    break;
                }
            }
        }
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(300), 1024)
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn store(&self, session: &SessionId, stream: &StreamId, message: JsonRpcMessage) -> String {
        let key = (session.clone(), stream.clone());
        let entry = self.ledgers.entry(key).or_insert_with(|| Mutex::new(Ledger::new()));
        let mut ledger = entry.lock();
        let seq = ledger.next_seq;
        ledger.next_seq += 1;
        let id = seq.to_string();
        ledger.events.push_back((seq, StoredEvent { id: id.clone(), message }, Instant::now()));
        self.evict_expired(&mut ledger);
        while ledger.events.len() > self.max_per_stream {
            ledger.events.pop_front();
        }
        id
    }

    async fn replay_after(
        &self,
        session: &SessionId,
        stream: &StreamId,
        last_event_id: &str,
    ) -> Vec<StoredEvent> {
        let Some(entry) = self.ledgers.get(&(session.clone(), stream.clone())) else {
            return Vec::new();
        };
        let mut ledger = entry.lock();
        self.evict_expired(&mut ledger);
        let Ok(last_seq) = last_event_id.parse::<u64>() else {
            return Vec::new();
        };
        ledger
            .events
            .iter()
            .filter(|(seq, _, _)| *seq > last_seq)
            .map(|(_, event, _)| event.clone())
            .collect()
    }

    async fn drop_session(&self, session: &SessionId) {
        self.ledgers.retain(|(sid, _), _| sid != session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcprt_protocol::JsonRpcNotification;

    fn notif(method: &str) -> JsonRpcMessage {
        JsonRpcMessage::Notification(JsonRpcNotification::new(method, None))
    }

    #[tokio::test]
    async fn ids_are_strictly_monotonic_per_stream() {
        let store = InMemoryEventStore::default();
        let session = SessionId::new();
        let stream = MAIN_STREAM.to_string();
        let a = store.store(&session, &stream, notif("notifications/a")).await;
        let b = store.store(&session, &stream, notif("notifications/b")).await;
        assert!(a.parse::<u64>().unwrap() < b.parse::<u64>().unwrap());
    }

    #[tokio::test]
    async fn replay_after_returns_only_newer_events() {
        let store = InMemoryEventStore::default();
        let session = SessionId::new();
        let stream = MAIN_STREAM.to_string();
        let first = store.store(&session, &stream, notif("notifications/a")).await;
        store.store(&session, &stream, notif("notifications/b")).await;

        let replayed = store.replay_after(&session, &stream, &first).await;
        assert_eq!(replayed.len(), 1);
        assert!(matches!(&replayed[0].message, JsonRpcMessage::Notification(n) if n.method == "notifications/b"));
    }

    #[tokio::test]
    async fn unknown_last_event_id_replays_nothing() {
        let store = InMemoryEventStore::default();
        let session = SessionId::new();
        let stream = MAIN_STREAM.to_string();
        store.store(&session, &stream, notif("notifications/a")).await;
        assert!(store.replay_after(&session, &stream, "not-a-number").await.is_empty());
    }

    #[tokio::test]
    async fn ttl_drops_old_events() {
        let store = InMemoryEventStore::new(Duration::from_millis(1), 1024);
        let session = SessionId::new();
        let stream = MAIN_STREAM.to_string();
        let first = store.store(&session, &stream, notif("notifications/a")).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        store.store(&session, &stream, notif("notifications/b")).await;

        let replayed = store.replay_after(&session, &stream, &first).await;
        // The first event (and its window) has expired; only what survives
        // the eviction sweep comes back, with no error.
        assert!(replayed.len() <= 1);
    }

    #[tokio::test]
    async fn drop_session_clears_all_its_streams() {
        let store = InMemoryEventStore::default();
        let session = SessionId::new();
        let stream = MAIN_STREAM.to_string();
        store.store(&session, &stream, notif("notifications/a")).await;
        store.drop_session(&session).await;
        assert_eq!(store.ledgers.len(), 0);
    }
}
