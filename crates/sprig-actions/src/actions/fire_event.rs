//! FireEvent action

use crate::action::{Action, ActionKind, ActionType};
use crate::effects::Effect;
use crate::error::Result;
use crate::processor::{unexpected_action, ActionProcessor, Invocation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sprig_expr::ExprOr;

/// Report a named event to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FireEvent {
    pub name: ExprOr<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

pub struct FireEventProcessor;

#[async_trait]
impl ActionProcessor for FireEventProcessor {
    fn action_type(&self) -> ActionType {
        ActionType::FireEvent
    }

    fn description(&self) -> &str {
        "Fire a named event at the host"
    }

    async fn execute(&self, action: &Action, inv: &Invocation<'_>) -> Result<()> {
        let ActionKind::FireEvent(event) = &action.kind else {
            return Err(unexpected_action(self.action_type(), action));
        };
        let name = inv.require(&event.name, "name")?;
        let payload = inv.evaluate_nested(&event.payload);
        inv.context
            .perform(Effect::FireEvent { name, payload })
            .await?;
        Ok(())
    }
}
