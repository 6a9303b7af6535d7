//! RebuildState action

use crate::action::{Action, ActionKind, ActionType};
use crate::error::Result;
use crate::processor::{unexpected_action, ActionProcessor, Invocation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Notify a region's dependents without writing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_context_name: Option<String>,
}

pub struct RebuildStateProcessor;

#[async_trait]
impl ActionProcessor for RebuildStateProcessor {
    fn action_type(&self) -> ActionType {
        ActionType::RebuildState
    }

    fn description(&self) -> &str {
        "Force dependents of a state region to recompute"
    }

    async fn execute(&self, action: &Action, inv: &Invocation<'_>) -> Result<()> {
        let ActionKind::RebuildState(rebuild) = &action.kind else {
            return Err(unexpected_action(self.action_type(), action));
        };
        inv.target_state(rebuild.state_context_name.as_deref())?
            .flush();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::actions::testing::Harness;
    use serde_json::json;

    #[tokio::test]
    async fn test_rebuild_flushes() {
        let harness = Harness::new();
        harness.state.set("x", json!(1), false);

        harness
            .run(json!({"type": "rebuildState"}))
            .await
            .unwrap();

        assert_eq!(harness.state.revision(), 1);
        assert_eq!(harness.state.get("x"), Some(json!(1)));
    }
}
