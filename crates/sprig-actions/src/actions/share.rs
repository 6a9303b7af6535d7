//! Share action

use crate::action::{Action, ActionKind, ActionType};
use crate::effects::Effect;
use crate::error::Result;
use crate::processor::{unexpected_action, ActionProcessor, Invocation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sprig_expr::ExprOr;

/// Invoke the system share sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Share {
    pub message: ExprOr<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<ExprOr<String>>,
}

pub struct ShareProcessor;

#[async_trait]
impl ActionProcessor for ShareProcessor {
    fn action_type(&self) -> ActionType {
        ActionType::Share
    }

    fn description(&self) -> &str {
        "Share text through the system share sheet"
    }

    async fn execute(&self, action: &Action, inv: &Invocation<'_>) -> Result<()> {
        let ActionKind::Share(share) = &action.kind else {
            return Err(unexpected_action(self.action_type(), action));
        };
        let message = inv.require(&share.message, "message")?;
        let subject = share.subject.as_ref().and_then(|s| inv.evaluate(s));

        inv.context
            .perform(Effect::Share { message, subject })
            .await?;
        Ok(())
    }
}
