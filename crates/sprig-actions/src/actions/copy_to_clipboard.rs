//! CopyToClipboard action

use crate::action::{Action, ActionKind, ActionType};
use crate::effects::Effect;
use crate::error::Result;
use crate::processor::{unexpected_action, ActionProcessor, Invocation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sprig_expr::ExprOr;

/// Put text on the system clipboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyToClipboard {
    pub message: ExprOr<String>,
}

pub struct CopyToClipboardProcessor;

#[async_trait]
impl ActionProcessor for CopyToClipboardProcessor {
    fn action_type(&self) -> ActionType {
        ActionType::CopyToClipboard
    }

    fn description(&self) -> &str {
        "Copy text to the clipboard"
    }

    async fn execute(&self, action: &Action, inv: &Invocation<'_>) -> Result<()> {
        let ActionKind::CopyToClipboard(copy) = &action.kind else {
            return Err(unexpected_action(self.action_type(), action));
        };
        let text = inv.require(&copy.message, "message")?;
        inv.context.perform(Effect::CopyToClipboard { text }).await?;
        Ok(())
    }
}
