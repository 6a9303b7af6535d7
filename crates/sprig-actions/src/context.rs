//! Resources handed to processors
//!
//! The [`ActionContext`] is the opaque handle an executor passes through to
//! every processor: the host's effect handler, the message bus, the object
//! store and method bindings for ControlObject, and the app state region.

use crate::bindings::{MethodBindingRegistry, ObjectStore};
use crate::bus::MessageBus;
use crate::effects::{Effect, EffectHandler, NoopEffects};
use crate::error::Result;
use crate::state::{StateContext, APP_STATE_NAMESPACE};
use serde_json::Value;
use std::sync::Arc;

/// Collaborators shared by every action in a flow
#[derive(Clone)]
pub struct ActionContext {
    effects: Arc<dyn EffectHandler>,
    bus: MessageBus,
    bindings: Arc<MethodBindingRegistry>,
    objects: Arc<ObjectStore>,
    app_state: Arc<StateContext>,
}

impl Default for ActionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionContext {
    /// Create a context with no-op effects and the built-in controllers
    pub fn new() -> Self {
        Self {
            effects: Arc::new(NoopEffects),
            bus: MessageBus::default(),
            bindings: Arc::new(MethodBindingRegistry::with_builtins()),
            objects: Arc::new(ObjectStore::new()),
            app_state: Arc::new(StateContext::new(APP_STATE_NAMESPACE)),
        }
    }

    /// Set the effect handler
    pub fn with_effects(mut self, effects: Arc<dyn EffectHandler>) -> Self {
        self.effects = effects;
        self
    }

    /// Set the message bus
    pub fn with_bus(mut self, bus: MessageBus) -> Self {
        self.bus = bus;
        self
    }

    /// Set the method bindings
    pub fn with_bindings(mut self, bindings: Arc<MethodBindingRegistry>) -> Self {
        self.bindings = bindings;
        self
    }

    /// Set the object store
    pub fn with_objects(mut self, objects: Arc<ObjectStore>) -> Self {
        self.objects = objects;
        self
    }

    /// Set the app state region
    pub fn with_app_state(mut self, app_state: Arc<StateContext>) -> Self {
        self.app_state = app_state;
        self
    }

    pub fn effects(&self) -> &Arc<dyn EffectHandler> {
        &self.effects
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn bindings(&self) -> &MethodBindingRegistry {
        &self.bindings
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    pub fn app_state(&self) -> &Arc<StateContext> {
        &self.app_state
    }

    /// Hand an effect to the host
    pub async fn perform(&self, effect: Effect) -> Result<Value> {
        self.effects.perform(effect).await
    }
}

impl std::fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionContext")
            .field("bus", &self.bus)
            .field("bindings", &self.bindings)
            .field("objects", &self.objects)
            .field("app_state", &self.app_state.namespace())
            .finish()
    }
}
