//! ShowToast action

use crate::action::{Action, ActionKind, ActionType};
use crate::effects::{Effect, ToastDuration};
use crate::error::Result;
use crate::processor::{unexpected_action, ActionProcessor, Invocation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sprig_expr::ExprOr;

/// Show a transient message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowToast {
    pub message: ExprOr<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<ExprOr<ToastDuration>>,
}

/// Hands the message to the host's toast effect
pub struct ShowToastProcessor;

#[async_trait]
impl ActionProcessor for ShowToastProcessor {
    fn action_type(&self) -> ActionType {
        ActionType::ShowToast
    }

    fn description(&self) -> &str {
        "Show a transient message"
    }

    async fn execute(&self, action: &Action, inv: &Invocation<'_>) -> Result<()> {
        let ActionKind::ShowToast(toast) = &action.kind else {
            return Err(unexpected_action(self.action_type(), action));
        };
        let message = inv.require(&toast.message, "message")?;
        let duration = toast
            .duration
            .as_ref()
            .and_then(|d| inv.evaluate(d))
            .unwrap_or_default();

        inv.context
            .perform(Effect::ShowToast { message, duration })
            .await?;
        Ok(())
    }
}
