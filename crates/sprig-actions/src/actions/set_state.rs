//! SetState action

use super::{default_true, is_true};
use crate::action::{Action, ActionKind, ActionType};
use crate::error::Result;
use crate::processor::{unexpected_action, ActionProcessor, Invocation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// One key to write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdate {
    pub state_name: String,
    /// Document value; expressions anywhere inside are evaluated
    #[serde(default)]
    pub new_value: Value,
}

impl StateUpdate {
    /// Evaluate the value of every update before anything is written
    pub(crate) fn evaluate_all(updates: &[StateUpdate], inv: &Invocation<'_>) -> Vec<(String, Value)> {
        updates
            .iter()
            .map(|update| (update.state_name.clone(), inv.evaluate_nested(&update.new_value)))
            .collect()
    }
}

/// Write keys of a state region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetState {
    /// Target region; the flow's own region when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_context_name: Option<String>,
    #[serde(default)]
    pub updates: Vec<StateUpdate>,
    /// Notify dependents once after all writes
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub rebuild: bool,
}

/// Applies every update, then notifies at most once
pub struct SetStateProcessor;

#[async_trait]
impl ActionProcessor for SetStateProcessor {
    fn action_type(&self) -> ActionType {
        ActionType::SetState
    }

    fn description(&self) -> &str {
        "Write values into a state region"
    }

    async fn execute(&self, action: &Action, inv: &Invocation<'_>) -> Result<()> {
        let ActionKind::SetState(set_state) = &action.kind else {
            return Err(unexpected_action(self.action_type(), action));
        };
        let target = inv.target_state(set_state.state_context_name.as_deref())?;
        let values = StateUpdate::evaluate_all(&set_state.updates, inv);

        debug!(
            namespace = %target.namespace(),
            keys = values.len(),
            rebuild = set_state.rebuild,
            "Setting state"
        );
        target.set_all(values, set_state.rebuild);
        Ok(())
    }
}
