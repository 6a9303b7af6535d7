//! Hierarchical variable environment for expression evaluation
//!
//! A [`ScopeContext`] is one frame of bindings plus an optional link to its
//! enclosing frame. Frames are never mutated once shared: extension always
//! builds a new frame that points at (not owns a copy of) the same parent.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A live source of variables backing a scope frame
///
/// Used for bindings whose values change between evaluations, such as a
/// state region. Lookups must not mutate the source.
pub trait VariableSource: Send + Sync {
    /// Look up a single variable
    fn lookup(&self, key: &str) -> Option<Value>;
}

/// One frame of a scope chain
#[derive(Clone, Default)]
pub struct ScopeContext {
    /// Frame name, for diagnostics
    name: String,

    /// Bindings owned by this frame
    variables: HashMap<String, Value>,

    /// Live bindings consulted after `variables`
    source: Option<Arc<dyn VariableSource>>,

    /// Enclosing frame
    enclosing: Option<Arc<ScopeContext>>,
}

impl ScopeContext {
    /// Create an empty root frame
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create an empty frame enclosed by `parent`
    pub fn child_of(parent: Arc<ScopeContext>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enclosing: Some(parent),
            ..Default::default()
        }
    }

    /// Bind a variable in this frame
    pub fn with_var(mut self, key: impl Into<String>, value: Value) -> Self {
        self.variables.insert(key.into(), value);
        self
    }

    /// Bind several variables in this frame
    pub fn with_variables<I, K>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.variables
            .extend(variables.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Back this frame with a live variable source
    pub fn with_source(mut self, source: Arc<dyn VariableSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the enclosing frame
    pub fn with_enclosing(mut self, enclosing: Arc<ScopeContext>) -> Self {
        self.enclosing = Some(enclosing);
        self
    }

    /// Get the frame name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the enclosing frame
    pub fn enclosing(&self) -> Option<&Arc<ScopeContext>> {
        self.enclosing.as_ref()
    }

    /// Resolve a variable, walking enclosing frames
    ///
    /// `Some(Value::Null)` means the key is bound to null; `None` means it
    /// is not bound anywhere in the chain.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        let mut frame = Some(self);
        while let Some(current) = frame {
            if let Some(value) = current.variables.get(key) {
                return Some(value.clone());
            }
            if let Some(value) = current.source.as_ref().and_then(|s| s.lookup(key)) {
                return Some(value);
            }
            frame = current.enclosing.as_deref();
        }
        None
    }

    /// Check whether a variable is bound anywhere in the chain
    pub fn contains(&self, key: &str) -> bool {
        self.get_value(key).is_some()
    }

    /// Copy this frame's bindings plus `overrides` into a new frame
    ///
    /// The new frame keeps the same enclosing chain and live source; `self`
    /// is left untouched.
    pub fn copy_and_extend<I, K>(&self, overrides: I) -> ScopeContext
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut variables = self.variables.clone();
        variables.extend(overrides.into_iter().map(|(k, v)| (k.into(), v)));
        ScopeContext {
            name: self.name.clone(),
            variables,
            source: self.source.clone(),
            enclosing: self.enclosing.clone(),
        }
    }

    /// Depth of the chain including this frame
    pub fn depth(&self) -> usize {
        1 + self.enclosing.as_ref().map_or(0, |e| e.depth())
    }
}

impl std::fmt::Debug for ScopeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeContext")
            .field("name", &self.name)
            .field("variables", &self.variables)
            .field("has_source", &self.source.is_some())
            .field("enclosing", &self.enclosing.as_ref().map(|e| e.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct CounterSource(Mutex<i64>);

    impl VariableSource for CounterSource {
        fn lookup(&self, key: &str) -> Option<Value> {
            (key == "counter").then(|| json!(*self.0.lock().unwrap()))
        }
    }

    fn parent() -> Arc<ScopeContext> {
        Arc::new(
            ScopeContext::new("app")
                .with_var("k", json!("parent"))
                .with_var("theme", json!("dark")),
        )
    }

    #[test]
    fn test_child_shadows_parent() {
        let child = ScopeContext::child_of(parent(), "page").with_var("k", json!("child"));

        assert_eq!(child.get_value("k"), Some(json!("child")));
        assert_eq!(child.get_value("theme"), Some(json!("dark")));
        assert_eq!(child.depth(), 2);
    }

    #[test]
    fn test_null_is_distinct_from_missing() {
        let scope = ScopeContext::new("page").with_var("empty", Value::Null);

        assert_eq!(scope.get_value("empty"), Some(Value::Null));
        assert_eq!(scope.get_value("absent"), None);
        assert!(scope.contains("empty"));
        assert!(!scope.contains("absent"));
    }

    #[test]
    fn test_copy_and_extend_without_overrides_is_identical() {
        let scope = ScopeContext::child_of(parent(), "page").with_var("a", json!(1));
        let copy = scope.copy_and_extend(Vec::<(String, Value)>::new());

        for key in ["a", "k", "theme", "missing"] {
            assert_eq!(copy.get_value(key), scope.get_value(key));
        }
        assert_eq!(copy.name(), "page");
    }

    #[test]
    fn test_copy_and_extend_leaves_original_untouched() {
        let shared = parent();
        let scope = ScopeContext::child_of(shared.clone(), "page").with_var("a", json!(1));
        let extended = scope.copy_and_extend([("a", json!(2)), ("k", json!("override"))]);

        assert_eq!(extended.get_value("a"), Some(json!(2)));
        assert_eq!(extended.get_value("k"), Some(json!("override")));
        assert_eq!(scope.get_value("a"), Some(json!(1)));
        assert_eq!(scope.get_value("k"), Some(json!("parent")));
        assert_eq!(shared.get_value("k"), Some(json!("parent")));
        assert!(Arc::ptr_eq(extended.enclosing().unwrap(), &shared));
    }

    #[test]
    fn test_live_source_reflects_changes() {
        let source = Arc::new(CounterSource(Mutex::new(1)));
        let scope = ScopeContext::new("state").with_source(source.clone());

        assert_eq!(scope.get_value("counter"), Some(json!(1)));
        *source.0.lock().unwrap() = 5;
        assert_eq!(scope.get_value("counter"), Some(json!(5)));
    }

    #[test]
    fn test_frame_variables_win_over_source() {
        let source = Arc::new(CounterSource(Mutex::new(1)));
        let scope = ScopeContext::new("state")
            .with_source(source)
            .with_var("counter", json!("local"));

        assert_eq!(scope.get_value("counter"), Some(json!("local")));
    }
}
