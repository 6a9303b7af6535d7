//! Action registry
//!
//! Maps each [`ActionType`] to its processor. This is the only place new
//! action kinds are plugged in; the executor never names a concrete type.

use crate::action::ActionType;
use crate::error::{ActionError, Result};
use crate::processor::ActionProcessor;
use std::collections::HashMap;
use std::sync::Arc;

/// Processor lookup table, populated before the executor is built
#[derive(Clone, Default)]
pub struct ActionRegistry {
    processors: HashMap<ActionType, Arc<dyn ActionProcessor>>,
}

impl ActionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every built-in processor
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::actions::register_all(&mut registry);
        registry
    }

    /// Register a processor, replacing any for the same type
    pub fn register<P: ActionProcessor + 'static>(&mut self, processor: P) {
        self.register_arc(Arc::new(processor));
    }

    /// Register a processor (Arc version for shared ownership)
    pub fn register_arc(&mut self, processor: Arc<dyn ActionProcessor>) {
        self.processors.insert(processor.action_type(), processor);
    }

    /// Get the processor for a type
    pub fn get(&self, action_type: &ActionType) -> Option<&Arc<dyn ActionProcessor>> {
        self.processors.get(action_type)
    }

    /// Check if a type has a processor
    pub fn has_processor(&self, action_type: &ActionType) -> bool {
        self.processors.contains_key(action_type)
    }

    /// Registered types, sorted
    pub fn action_types(&self) -> Vec<&ActionType> {
        let mut types: Vec<_> = self.processors.keys().collect();
        types.sort();
        types
    }

    /// Registered host-defined types
    pub fn custom_types(&self) -> impl Iterator<Item = &ActionType> {
        self.processors.keys().filter(|t| t.is_custom())
    }

    /// Get the number of registered processors
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Fail if any built-in type lacks a processor
    pub fn validate(&self) -> Result<()> {
        match ActionType::BUILTIN
            .iter()
            .find(|action_type| !self.has_processor(action_type))
        {
            Some(missing) => Err(ActionError::UnsupportedType(missing.tag())),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("action_types", &self.action_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{NoopProcessor, ShowToastProcessor};

    #[test]
    fn test_registry_new() {
        let registry = ActionRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.validate().is_err());
    }

    #[test]
    fn test_registry_register() {
        let mut registry = ActionRegistry::new();
        registry.register(ShowToastProcessor);

        assert!(registry.has_processor(&ActionType::ShowToast));
        assert!(!registry.has_processor(&ActionType::Delay));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get(&ActionType::ShowToast).unwrap().action_type(),
            ActionType::ShowToast
        );
    }

    #[test]
    fn test_builtins_are_complete() {
        let registry = ActionRegistry::with_builtins();
        assert!(registry.validate().is_ok());
        assert_eq!(registry.len(), ActionType::BUILTIN.len());
        assert_eq!(registry.custom_types().count(), 0);
    }

    #[test]
    fn test_validate_names_missing_type() {
        let mut registry = ActionRegistry::new();
        registry.register(NoopProcessor);
        match registry.validate() {
            Err(ActionError::UnsupportedType(tag)) => assert_eq!(tag, "Action.showToast"),
            other => panic!("expected an unsupported type error, got {other:?}"),
        }
    }
}
