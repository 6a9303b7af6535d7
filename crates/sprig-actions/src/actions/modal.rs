//! ShowDialog and ShowBottomSheet actions
//!
//! Both present a view modally and wait for it to close. Whatever the view
//! returns is bound as `result` for the `onResult` flow.

use super::{default_true, is_true};
use crate::action::{Action, ActionKind, ActionType};
use crate::effects::{Effect, ModalKind};
use crate::error::Result;
use crate::flow::{optional_flow, ActionFlow};
use crate::processor::{unexpected_action, ActionProcessor, Invocation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sprig_expr::ExprOr;
use tracing::debug;

/// Fields shared by dialogs and bottom sheets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowModal {
    pub view_id: ExprOr<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub args: Value,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub barrier_dismissible: bool,
    #[serde(
        default,
        deserialize_with = "optional_flow",
        skip_serializing_if = "Option::is_none"
    )]
    pub on_result: Option<ActionFlow>,
}

async fn show(kind: ModalKind, modal: &ShowModal, inv: &Invocation<'_>) -> Result<()> {
    let view_id = inv.require(&modal.view_id, "viewId")?;
    let args = inv.evaluate_nested(&modal.args);

    let result = inv
        .context
        .perform(Effect::ShowModal {
            kind,
            view_id,
            args,
            barrier_dismissible: modal.barrier_dismissible,
        })
        .await?;
    debug!(?kind, result = %result, "Modal closed");

    inv.run_nested(modal.on_result.as_ref(), [("result", result)])
        .await;
    Ok(())
}

pub struct ShowDialogProcessor;

#[async_trait]
impl ActionProcessor for ShowDialogProcessor {
    fn action_type(&self) -> ActionType {
        ActionType::ShowDialog
    }

    fn description(&self) -> &str {
        "Show a dialog and wait for its result"
    }

    async fn execute(&self, action: &Action, inv: &Invocation<'_>) -> Result<()> {
        let ActionKind::ShowDialog(modal) = &action.kind else {
            return Err(unexpected_action(self.action_type(), action));
        };
        show(ModalKind::Dialog, modal, inv).await
    }
}

pub struct ShowBottomSheetProcessor;

#[async_trait]
impl ActionProcessor for ShowBottomSheetProcessor {
    fn action_type(&self) -> ActionType {
        ActionType::ShowBottomSheet
    }

    fn description(&self) -> &str {
        "Show a bottom sheet and wait for its result"
    }

    async fn execute(&self, action: &Action, inv: &Invocation<'_>) -> Result<()> {
        let ActionKind::ShowBottomSheet(modal) = &action.kind else {
            return Err(unexpected_action(self.action_type(), action));
        };
        show(ModalKind::BottomSheet, modal, inv).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::Harness;
    use crate::effects::RecordingEffects;
    use serde_json::json;

    #[tokio::test]
    async fn test_result_flows_into_on_result() {
        let harness = Harness::with_effects(
            RecordingEffects::new().with_response("showModal", json!({"confirmed": true})),
        );

        harness
            .run(json!({
                "type": "Action.showDialog",
                "viewId": "confirm",
                "barrierDismissible": false,
                "onResult": {"steps": [{
                    "type": "Action.setState",
                    "updates": [{"stateName": "confirmed", "newValue": "@{result.confirmed}"}],
                }]},
            }))
            .await
            .unwrap();

        assert_eq!(harness.state.get("confirmed"), Some(json!(true)));
        assert_eq!(
            harness.effects.of_kind("showModal")[0],
            Effect::ShowModal {
                kind: ModalKind::Dialog,
                view_id: "confirm".to_string(),
                args: Value::Null,
                barrier_dismissible: false,
            }
        );
    }

    #[tokio::test]
    async fn test_bottom_sheet_without_result_flow() {
        let harness = Harness::new();
        harness
            .run(json!({"type": "showBottomSheet", "viewId": "@{'picker'}"}))
            .await
            .unwrap();

        assert!(matches!(
            &harness.effects.effects()[0],
            Effect::ShowModal { kind: ModalKind::BottomSheet, view_id, barrier_dismissible: true, .. }
                if view_id == "picker"
        ));
    }
}
