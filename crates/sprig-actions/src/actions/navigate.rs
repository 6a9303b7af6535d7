//! NavigateToPage and NavigateBack actions

use super::is_false;
use crate::action::{Action, ActionKind, ActionType};
use crate::effects::Effect;
use crate::error::Result;
use crate::processor::{unexpected_action, ActionProcessor, Invocation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sprig_expr::ExprOr;

/// Open another page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateToPage {
    pub page_id: ExprOr<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub args: Value,
    /// Replace the current page instead of pushing
    #[serde(default, skip_serializing_if = "is_false")]
    pub replace: bool,
}

/// Leave the current page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateBack {
    /// Handed to whoever opened the page
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub result: Value,
}

pub struct NavigateToPageProcessor;

#[async_trait]
impl ActionProcessor for NavigateToPageProcessor {
    fn action_type(&self) -> ActionType {
        ActionType::NavigateToPage
    }

    fn description(&self) -> &str {
        "Navigate to a page"
    }

    async fn execute(&self, action: &Action, inv: &Invocation<'_>) -> Result<()> {
        let ActionKind::NavigateToPage(navigate) = &action.kind else {
            return Err(unexpected_action(self.action_type(), action));
        };
        let page_id = inv.require(&navigate.page_id, "pageId")?;
        let args = inv.evaluate_nested(&navigate.args);

        inv.context
            .perform(Effect::NavigateToPage {
                page_id,
                args,
                replace: navigate.replace,
            })
            .await?;
        Ok(())
    }
}

pub struct NavigateBackProcessor;

#[async_trait]
impl ActionProcessor for NavigateBackProcessor {
    fn action_type(&self) -> ActionType {
        ActionType::NavigateBack
    }

    fn description(&self) -> &str {
        "Navigate back to the previous page"
    }

    async fn execute(&self, action: &Action, inv: &Invocation<'_>) -> Result<()> {
        let ActionKind::NavigateBack(back) = &action.kind else {
            return Err(unexpected_action(self.action_type(), action));
        };
        let result = inv.evaluate_nested(&back.result);
        inv.context.perform(Effect::NavigateBack { result }).await?;
        Ok(())
    }
}
