//! Executor configuration
//!
//! Every field has a default, so an empty YAML document is a valid config.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the parser does with a step whose type tag it does not know
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownActionPolicy {
    /// Remove the step from the flow
    Drop,
    /// Keep the step as a no-op
    #[default]
    Fallback,
}

/// Configuration for [`crate::ActionExecutor`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ExecutorConfig {
    /// Handling of unknown action type tags
    pub unknown_actions: UnknownActionPolicy,

    /// Per-action timeout in milliseconds; no timeout when unset
    pub action_timeout_ms: Option<u64>,

    /// Capacity of the execution event channel
    pub event_capacity: usize,

    /// Per-channel buffer of the message bus
    pub bus_capacity: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            unknown_actions: UnknownActionPolicy::default(),
            action_timeout_ms: None,
            event_capacity: 1024,
            bus_capacity: 64,
        }
    }
}

impl ExecutorConfig {
    /// Parse a YAML document
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: ExecutorConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the unknown action policy
    pub fn with_unknown_actions(mut self, policy: UnknownActionPolicy) -> Self {
        self.unknown_actions = policy;
        self
    }

    /// Set the per-action timeout
    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Per-action timeout, if any
    pub fn action_timeout(&self) -> Option<Duration> {
        self.action_timeout_ms.map(Duration::from_millis)
    }

    /// Reject values the runtime cannot use
    pub fn validate(&self) -> Result<()> {
        if self.event_capacity == 0 {
            return Err(crate::ActionError::Config(
                "event_capacity must be greater than zero".to_string(),
            ));
        }
        if self.bus_capacity == 0 {
            return Err(crate::ActionError::Config(
                "bus_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.unknown_actions, UnknownActionPolicy::Fallback);
        assert_eq!(config.action_timeout(), None);
        assert_eq!(config.bus_capacity, 64);
    }

    #[test]
    fn test_from_yaml() {
        let config = ExecutorConfig::from_yaml(
            "unknown_actions: drop\naction_timeout_ms: 1500\n",
        )
        .unwrap();
        assert_eq!(config.unknown_actions, UnknownActionPolicy::Drop);
        assert_eq!(config.action_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.event_capacity, 1024);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(
            ExecutorConfig::from_yaml("{}").unwrap(),
            ExecutorConfig::default()
        );
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(ExecutorConfig::from_yaml("unknown_actions: sometimes").is_err());
        assert!(ExecutorConfig::from_yaml("bus_capacity: 0").is_err());
    }

    #[test]
    fn test_builders() {
        let config = ExecutorConfig::default()
            .with_unknown_actions(UnknownActionPolicy::Drop)
            .with_action_timeout(Duration::from_secs(2));
        assert_eq!(config.unknown_actions, UnknownActionPolicy::Drop);
        assert_eq!(config.action_timeout_ms, Some(2000));
    }
}
