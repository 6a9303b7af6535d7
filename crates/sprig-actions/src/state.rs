//! Mutable state regions
//!
//! A [`StateContext`] is the single mutable key/value store for one region
//! (a page, a component, the app). Writes go through [`StateContext::set`]
//! and friends so the notify contract stays accurate: each notification
//! bumps a revision published on a `watch` channel, and dependents recompute
//! when they see it change.

use serde_json::{Map, Value};
use sprig_expr::VariableSource;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::watch;
use tracing::trace;

/// Namespace of the process-wide app state region
pub const APP_STATE_NAMESPACE: &str = "appState";

/// A named, mutable state region
pub struct StateContext {
    /// Region name, used by actions to target it
    namespace: String,

    /// Current values
    values: RwLock<Map<String, Value>>,

    /// Enclosing region
    parent: Option<Arc<StateContext>>,

    /// Recomputation signal
    revision: watch::Sender<u64>,
}

impl StateContext {
    /// Create a root region
    pub fn new(namespace: impl Into<String>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            namespace: namespace.into(),
            values: RwLock::new(Map::new()),
            parent: None,
            revision,
        }
    }

    /// Create a region enclosed by `parent`
    pub fn with_parent(namespace: impl Into<String>, parent: Arc<StateContext>) -> Self {
        let mut state = Self::new(namespace);
        state.parent = Some(parent);
        state
    }

    /// Seed initial values without notifying
    pub fn with_values(self, values: Map<String, Value>) -> Self {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(values);
        self
    }

    /// Get the region name
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Get the enclosing region
    pub fn parent(&self) -> Option<&Arc<StateContext>> {
        self.parent.as_ref()
    }

    /// Read one value
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Snapshot of every value
    pub fn values(&self) -> Map<String, Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Write one value, notifying dependents when `notify` is set
    pub fn set(&self, key: impl Into<String>, value: Value, notify: bool) {
        self.set_all([(key.into(), value)], notify);
    }

    /// Write several values with at most one notification
    pub fn set_all<I>(&self, updates: I, notify: bool)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        {
            let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
            for (key, value) in updates {
                trace!(namespace = %self.namespace, key = %key, "State write");
                values.insert(key, value);
            }
        }
        if notify {
            self.flush();
        }
    }

    /// Notify dependents without changing any value
    pub fn flush(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Number of notifications so far
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Subscribe to recomputation signals
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Find this region or the nearest ancestor named `namespace`
    pub fn find(self: &Arc<Self>, namespace: &str) -> Option<Arc<StateContext>> {
        let mut current = Some(self);
        while let Some(state) = current {
            if state.namespace == namespace {
                return Some(state.clone());
            }
            current = state.parent.as_ref();
        }
        None
    }
}

/// Expressions see a region's keys directly, and the whole region under its
/// namespace. Enclosing regions are searched when the key is not found.
impl VariableSource for StateContext {
    fn lookup(&self, key: &str) -> Option<Value> {
        let mut current = Some(self);
        while let Some(state) = current {
            if let Some(value) = state.get(key) {
                return Some(value);
            }
            if state.namespace == key {
                return Some(Value::Object(state.values()));
            }
            current = state.parent.as_deref();
        }
        None
    }
}

impl std::fmt::Debug for StateContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateContext")
            .field("namespace", &self.namespace)
            .field("values", &self.values())
            .field("parent", &self.parent.as_ref().map(|p| p.namespace()))
            .field("revision", &self.revision())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_without_notify() {
        let state = StateContext::new("page");
        state.set("x", json!(1), false);

        assert_eq!(state.get("x"), Some(json!(1)));
        assert_eq!(state.revision(), 0);
    }

    #[test]
    fn test_flush_signals_once() {
        let state = StateContext::new("page");
        let mut rx = state.subscribe();
        state.set("x", json!(1), false);
        assert!(!rx.has_changed().unwrap());

        state.flush();
        assert_eq!(state.revision(), 1);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 1);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_set_with_notify() {
        let state = StateContext::new("page");
        state.set("x", json!(1), true);
        state.set("y", json!(2), true);
        assert_eq!(state.revision(), 2);
    }

    #[test]
    fn test_batch_write_notifies_once() {
        let state = StateContext::new("page");
        state.set_all(
            vec![("a".to_string(), json!(1)), ("b".to_string(), json!(2))],
            true,
        );
        assert_eq!(state.revision(), 1);
        assert_eq!(state.values(), json!({"a": 1, "b": 2}).as_object().cloned().unwrap());
    }

    #[test]
    fn test_find_ancestor() {
        let page = Arc::new(StateContext::new("page"));
        let card = Arc::new(StateContext::with_parent("card", page.clone()));

        assert!(Arc::ptr_eq(&card.find("page").unwrap(), &page));
        assert!(Arc::ptr_eq(&card.find("card").unwrap(), &card));
        assert!(card.find("missing").is_none());
        assert!(page.find("card").is_none());
    }

    #[test]
    fn test_variable_lookup() {
        let mut seed = Map::new();
        seed.insert("title".to_string(), json!("Home"));
        let page = Arc::new(StateContext::new("page").with_values(seed));
        let card = StateContext::with_parent("card", page);
        card.set("count", json!(3), false);

        assert_eq!(card.lookup("count"), Some(json!(3)));
        assert_eq!(card.lookup("title"), Some(json!("Home")));
        assert_eq!(card.lookup("card"), Some(json!({"count": 3})));
        assert_eq!(card.lookup("page"), Some(json!({"title": "Home"})));
        assert_eq!(card.lookup("nope"), None);
    }
}
