//! Error types for the action interpreter
//!
//! Parse and dispatch problems are reported here as well as processor
//! failures. Only [`ActionError::UnsupportedType`] is fatal, and only when an
//! executor is being constructed; everything else is logged by the executor
//! and the flow moves on.

use std::time::Duration;
use thiserror::Error;

/// Error type for action parsing and execution
#[derive(Debug, Error)]
pub enum ActionError {
    /// No processor registered for an action type
    #[error("unsupported action type: {0}")]
    UnsupportedType(String),

    /// Descriptor is missing a field or has a malformed one
    #[error("invalid action descriptor: {0}")]
    InvalidDescriptor(String),

    /// An evaluated field has no usable value
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Named state region is not in the state chain
    #[error("state context not found: {0}")]
    StateContextNotFound(String),

    /// Named object is not in the object store
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// No methods registered for an object category
    #[error("no methods registered for category '{0}'")]
    CategoryNotFound(String),

    /// Category exists but the method does not
    #[error("method not found: {category}.{method}")]
    MethodNotFound { category: String, method: String },

    /// A platform effect handler failed
    #[error("effect failed: {0}")]
    EffectFailed(String),

    /// Processor failed for another reason
    #[error("action execution failed: {0}")]
    ExecutionFailed(String),

    /// Processor did not finish in time
    #[error("action timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid executor configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for action operations
pub type Result<T> = std::result::Result<T, ActionError>;

impl From<serde_yaml::Error> for ActionError {
    fn from(err: serde_yaml::Error) -> Self {
        ActionError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ActionError::UnsupportedType("Action.teleport".to_string());
        assert_eq!(err.to_string(), "unsupported action type: Action.teleport");

        let err = ActionError::MethodNotFound {
            category: "timer".to_string(),
            method: "missing".to_string(),
        };
        assert_eq!(err.to_string(), "method not found: timer.missing");

        let err = ActionError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "action timed out after 250ms");
    }

    #[test]
    fn test_error_from_serde() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ActionError = json_err.into();
        assert!(matches!(err, ActionError::Serialization(_)));

        let yaml_err = serde_yaml::from_str::<u32>("[").unwrap_err();
        let err: ActionError = yaml_err.into();
        assert!(matches!(err, ActionError::Config(_)));
    }
}
