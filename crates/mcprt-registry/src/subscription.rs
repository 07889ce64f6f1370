//! Exact-URI resource subscriptions (spec §4.7).
//!
//! Subscriptions are keyed by URI, independent of whether a matching
//! resource currently exists; they survive removal and reactivate silently
//! on re-registration.

use std::collections::HashSet;

use parking_lot::RwLock;

/// The set of resource URIs a peer has subscribed to within a session.
#[derive(Debug, Default)]
pub struct ResourceSubscriptions {
    uris: RwLock<HashSet<String>>,
}

impl ResourceSubscriptions {
    /// Create an empty subscription set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a URI. Idempotent.
    pub fn subscribe(&self, uri: impl Into<String>) {
        self.uris.write().insert(uri.into());
    }

    /// Unsubscribe from a URI.
    pub fn unsubscribe(&self, uri: &str) {
        self.uris.write().remove(uri);
    }

    /// Whether a URI currently has a subscriber.
    #[must_use]
    pub fn is_subscribed(&self, uri: &str) -> bool {
        self.uris.read().contains(uri)
    }

    /// Number of subscribed URIs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.uris.read().len()
    }

    /// Whether there are no subscriptions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uris.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_survives_unrelated_removal_and_reactivates() {
        let subs = ResourceSubscriptions::new();
        subs.subscribe("file:///a.txt");
        assert!(subs.is_subscribed("file:///a.txt"));

        // a resource registry removing the backing resource does not touch
        // the subscription set; re-registering the resource just works.
        assert!(subs.is_subscribed("file:///a.txt"));

        subs.unsubscribe("file:///a.txt");
        assert!(!subs.is_subscribed("file:///a.txt"));

        subs.subscribe("file:///a.txt");
        assert!(subs.is_subscribed("file:///a.txt"));
    }
}
