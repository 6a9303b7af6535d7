//! Method binding registry
//!
//! Lets documents call methods on opaque stateful objects (timers,
//! cancellation tokens, controllers) by name. Dispatch is keyed on the
//! object's declared category plus the method name; commands are typed
//! against the concrete object type and erased at registration.

use crate::error::{ActionError, Result};
use serde_json::{Map, Value};
use sprig_expr::FromDynamic;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Evaluated method arguments, keyed by parameter name
pub type MethodArgs = Map<String, Value>;

/// An object that can be driven through the registry
pub trait Controllable: Any + Send + Sync {
    /// Stable category tag used for dispatch
    fn category(&self) -> &str;

    /// Access the concrete type for downcasting
    fn as_any(&self) -> &dyn Any;
}

type Command = Arc<dyn Fn(&dyn Controllable, &MethodArgs) -> Result<Value> + Send + Sync>;

/// Category + method name dispatch table
///
/// Populated at startup and read-only afterwards.
#[derive(Default, Clone)]
pub struct MethodBindingRegistry {
    categories: HashMap<String, HashMap<String, Command>>,
}

impl MethodBindingRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in controllers registered
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::controllers::register_builtins(&mut registry);
        registry
    }

    /// Register one typed command
    pub fn register_method<T, F>(&mut self, category: &str, method: &str, command: F)
    where
        T: Controllable,
        F: Fn(&T, &MethodArgs) -> Result<Value> + Send + Sync + 'static,
    {
        let category_name = category.to_string();
        let erased: Command = Arc::new(move |target: &dyn Controllable, args: &MethodArgs| {
            let concrete = target.as_any().downcast_ref::<T>().ok_or_else(|| {
                ActionError::ExecutionFailed(format!(
                    "object of category '{}' is not a {}",
                    category_name,
                    std::any::type_name::<T>()
                ))
            })?;
            command(concrete, args)
        });
        self.categories
            .entry(category.to_string())
            .or_default()
            .insert(method.to_string(), erased);
    }

    /// Register several typed commands for one category
    pub fn register_methods<T, I>(&mut self, category: &str, methods: I)
    where
        T: Controllable,
        I: IntoIterator<Item = (&'static str, fn(&T, &MethodArgs) -> Result<Value>)>,
    {
        for (name, command) in methods {
            self.register_method::<T, _>(category, name, command);
        }
    }

    /// Check whether a method is registered
    pub fn has_method(&self, category: &str, method: &str) -> bool {
        self.categories
            .get(category)
            .is_some_and(|methods| methods.contains_key(method))
    }

    /// Registered method names for a category
    pub fn methods(&self, category: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .categories
            .get(category)
            .map(|methods| methods.keys().map(String::as_str).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    /// Invoke `method` on `instance`
    ///
    /// A missing category or method is an error, never a no-op.
    pub fn execute(
        &self,
        instance: &dyn Controllable,
        method: &str,
        args: &MethodArgs,
    ) -> Result<Value> {
        let category = instance.category();
        let methods = self
            .categories
            .get(category)
            .ok_or_else(|| ActionError::CategoryNotFound(category.to_string()))?;
        let command = methods
            .get(method)
            .ok_or_else(|| ActionError::MethodNotFound {
                category: category.to_string(),
                method: method.to_string(),
            })?;
        debug!(category = %category, method = %method, "Invoking bound method");
        command(instance, args)
    }
}

impl std::fmt::Debug for MethodBindingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut categories: Vec<_> = self.categories.keys().collect();
        categories.sort();
        f.debug_struct("MethodBindingRegistry")
            .field("categories", &categories)
            .finish()
    }
}

/// Named objects that ControlObject actions can target
#[derive(Default)]
pub struct ObjectStore {
    objects: RwLock<HashMap<String, Arc<dyn Controllable>>>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object under `name`, replacing any previous one
    pub fn insert(&self, name: impl Into<String>, object: Arc<dyn Controllable>) {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), object);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Controllable>> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn remove(&self, name: &str) -> Option<Arc<dyn Controllable>> {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<_> = objects.keys().collect();
        names.sort();
        f.debug_struct("ObjectStore").field("objects", &names).finish()
    }
}

/// Read an argument, falling back to `default` when absent or not coercible
pub fn arg_or<T: FromDynamic>(args: &MethodArgs, name: &str, default: T) -> T {
    args.get(name).and_then(T::from_dynamic).unwrap_or(default)
}

/// Read a required argument
pub fn required_arg<T: FromDynamic>(args: &MethodArgs, name: &str) -> Result<T> {
    args.get(name)
        .and_then(T::from_dynamic)
        .ok_or_else(|| ActionError::InvalidParameters(format!("missing argument '{name}'")))
}
