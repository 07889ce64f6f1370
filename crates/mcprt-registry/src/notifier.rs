//! Debounced list-changed notification (spec §4.7: "bursts within a short
//! window coalesce").

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Coalesces bursts of [`ChangeNotifier::notify`] calls within `debounce`
/// into a single firing of the callback.
///
/// Each call bumps a generation counter and spawns a delayed check; only
/// the last-spawned check survives to see its own generation still current,
/// so interleaved bursts fire the callback exactly once after the burst
/// settles.
#[derive(Clone)]
pub struct ChangeNotifier {
    inner: Arc<Inner>,
}

struct Inner {
    generation: AtomicU64,
    debounce: Duration,
    callback: Box<dyn Fn() + Send + Sync>,
}

impl ChangeNotifier {
    /// Create a notifier that invokes `callback` at most once per
    /// `debounce`-wide burst of [`Self::notify`] calls.
    pub fn new(debounce: Duration, callback: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                generation: AtomicU64::new(0),
                debounce,
                callback: Box::new(callback),
            }),
        }
    }

    /// Signal a change. Coalesces with any other `notify` call within the
    /// debounce window.
    pub fn notify(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            if inner.generation.load(Ordering::SeqCst) == generation {
                (inner.callback)();
            }
        });
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("debounce", &self.inner.debounce)
            .finish()
    }
}
