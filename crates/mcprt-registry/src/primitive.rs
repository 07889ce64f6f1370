//! Generic keyed primitive collection with debounced list-changed
//! notification and opaque-cursor pagination (spec §4.7).

use std::collections::BTreeMap;
use std::time::Duration;

use parking_lot::RwLock;

use crate::notifier::ChangeNotifier;

/// Any MCP primitive that is uniquely named within its registry.
pub trait Named {
    /// The primitive's registry-unique name.
    fn name(&self) -> &str;
}

/// Default debounce window for list-changed notifications.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// A keyed collection of one primitive kind (tools, prompts, resources, or
/// resource templates), ordered by name for stable pagination.
pub struct PrimitiveRegistry<T> {
    items: RwLock<BTreeMap<String, T>>,
    notifier: ChangeNotifier,
}

impl<T> std::fmt::Debug for PrimitiveRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimitiveRegistry")
            .field("len", &self.items.read().len())
            .finish()
    }
}

impl<T: Named + Clone + Send + Sync + 'static> PrimitiveRegistry<T> {
    /// Create an empty registry that fires `on_changed` at most once per
    /// debounce burst when primitives are added or removed.
    pub fn new(on_changed: impl Fn() + Send + Sync + 'static) -> Self {
        Self::with_debounce(DEFAULT_DEBOUNCE, on_changed)
    }

    /// Create an empty registry with an explicit debounce window.
    pub fn with_debounce(debounce: Duration, on_changed: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
            notifier: ChangeNotifier::new(debounce, on_changed),
        }
    }

    /// Add a primitive, replacing any existing entry of the same name.
    /// Emits a debounced list-changed notification either way.
    pub fn add(&self, item: T) {
        self.items.write().insert(item.name().to_string(), item);
        self.notifier.notify();
    }

    /// Remove a primitive by name. Emits a debounced list-changed
    /// notification only if an entry was actually removed.
    pub fn remove(&self, name: &str) -> Option<T> {
        let removed = self.items.write().remove(name);
        if removed.is_some() {
            self.notifier.notify();
        }
        removed
    }

    /// Fetch a primitive by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<T> {
        self.items.read().get(name).cloned()
    }

    /// Number of registered primitives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// List up to `limit` primitives after an opaque cursor (the previous
    /// page's last name), returning the page plus a cursor for the next
    /// page if more remain.
    ///
    /// The cursor is the primitive's sort key (its name), which stays
    /// stable under concurrent modification: an insertion or removal
    /// elsewhere in the map does not perturb a cursor already handed out.
    #[must_use]
    pub fn list(&self, cursor: Option<&str>, limit: usize) -> (Vec<T>, Option<String>) {
        let items = self.items.read();
        let iter = match cursor {
            Some(after) => items.range::<String, _>((
                std::ops::Bound::Excluded(after.to_string()),
                std::ops::Bound::Unbounded,
            )),
            None => items.range::<String, _>(..),
        };

        let mut page: Vec<T> = Vec::with_capacity(limit);
        let mut last_key: Option<String> = None;
        let mut more = false;
        for (key, value) in iter {
            if page.len() == limit {
                more = true;
                break;
            }
            page.push(value.clone());
            last_key = Some(key.clone());
        }

        (page, if more { last_key } else { None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Debug)]
    struct Item(String);

    impl Named for Item {
        fn name(&self) -> &str {
            &self.0
        }
    }

    #[tokio::test]
    async fn add_replaces_duplicate_name() {
        let registry = PrimitiveRegistry::<Item>::new(|| {});
        registry.add(Item("a".into()));
        registry.add(Item("a".into()));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn pagination_walks_pages_in_order() {
        let registry = PrimitiveRegistry::<Item>::new(|| {});
        for n in ["a", "b", "c", "d", "e"] {
            registry.add(Item(n.into()));
        }
        let (page1, cursor1) = registry.list(None, 2);
        assert_eq!(page1, vec![Item("a".into()), Item("b".into())]);
        assert_eq!(cursor1.as_deref(), Some("b"));

        let (page2, cursor2) = registry.list(cursor1.as_deref(), 2);
        assert_eq!(page2, vec![Item("c".into()), Item("d".into())]);
        assert_eq!(cursor2.as_deref(), Some("d"));

        let (page3, cursor3) = registry.list(cursor2.as_deref(), 2);
        assert_eq!(page3, vec![Item("e".into())]);
        assert_eq!(cursor3, None);
    }

    #[tokio::test]
    async fn cursor_stable_under_concurrent_insert() {
        let registry = PrimitiveRegistry::<Item>::new(|| {});
        for n in ["a", "c", "e"] {
            registry.add(Item(n.into()));
        }
        let (page1, cursor1) = registry.list(None, 1);
        assert_eq!(page1, vec![Item("a".into())]);

        registry.add(Item("b".into()));

        let (page2, _) = registry.list(cursor1.as_deref(), 1);
        assert_eq!(page2, vec![Item("b".into())]);
    }
}
