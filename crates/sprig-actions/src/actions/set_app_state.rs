//! SetAppState action

use super::set_state::StateUpdate;
use super::{default_true, is_true};
use crate::action::{Action, ActionKind, ActionType};
use crate::error::Result;
use crate::processor::{unexpected_action, ActionProcessor, Invocation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Write keys of the app state region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAppState {
    #[serde(default)]
    pub updates: Vec<StateUpdate>,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub rebuild: bool,
}

pub struct SetAppStateProcessor;

#[async_trait]
impl ActionProcessor for SetAppStateProcessor {
    fn action_type(&self) -> ActionType {
        ActionType::SetAppState
    }

    fn description(&self) -> &str {
        "Write values into the app state region"
    }

    async fn execute(&self, action: &Action, inv: &Invocation<'_>) -> Result<()> {
        let ActionKind::SetAppState(set_app_state) = &action.kind else {
            return Err(unexpected_action(self.action_type(), action));
        };
        let values = StateUpdate::evaluate_all(&set_app_state.updates, inv);
        inv.context
            .app_state()
            .set_all(values, set_app_state.rebuild);
        Ok(())
    }
}
