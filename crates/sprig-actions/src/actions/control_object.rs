//! ControlObject action
//!
//! Calls a method on a named object from the object store. Arguments are
//! evaluated here; coercing them is the method's job.

use crate::action::{Action, ActionKind, ActionType};
use crate::bindings::MethodArgs;
use crate::error::{ActionError, Result};
use crate::processor::{unexpected_action, ActionProcessor, Invocation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sprig_expr::ExprOr;
use tracing::debug;

/// Call a method on a controllable object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlObject {
    /// Name of the object in the store
    pub object: ExprOr<String>,
    pub method: ExprOr<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub args: Value,
}

pub struct ControlObjectProcessor;

#[async_trait]
impl ActionProcessor for ControlObjectProcessor {
    fn action_type(&self) -> ActionType {
        ActionType::ControlObject
    }

    fn description(&self) -> &str {
        "Call a method on a named object"
    }

    async fn execute(&self, action: &Action, inv: &Invocation<'_>) -> Result<()> {
        let ActionKind::ControlObject(control) = &action.kind else {
            return Err(unexpected_action(self.action_type(), action));
        };
        let name = inv.require(&control.object, "object")?;
        let method = inv.require(&control.method, "method")?;
        let args: MethodArgs = match inv.evaluate_nested(&control.args) {
            Value::Object(args) => args,
            Value::Null => MethodArgs::new(),
            other => {
                return Err(ActionError::InvalidParameters(format!(
                    "args must be an object, got {other}"
                )))
            }
        };

        let object = inv
            .context
            .objects()
            .get(&name)
            .ok_or_else(|| ActionError::ObjectNotFound(name.clone()))?;
        let result = inv
            .context
            .bindings()
            .execute(object.as_ref(), &method, &args)?;
        debug!(object = %name, method = %method, result = %result, "Object method returned");
        Ok(())
    }
}
