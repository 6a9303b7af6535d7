//! Processor trait definition
//!
//! A processor is the executable handler for one [`ActionType`]. It is
//! stateless or holds only injected collaborators; everything a single run
//! needs arrives in the [`Invocation`].

use crate::action::{Action, ActionType};
use crate::context::ActionContext;
use crate::error::{ActionError, Result};
use crate::executor::ActionExecutor;
use crate::flow::ActionFlow;
use crate::state::{StateContext, APP_STATE_NAMESPACE};
use async_trait::async_trait;
use serde_json::Value;
use sprig_expr::{evaluate_nested_expressions, ExprOr, FromDynamic, ScopeContext};
use std::sync::Arc;
use std::time::Duration;

/// Handler bound to one action type
///
/// # Example
///
/// ```ignore
/// use sprig_actions::{Action, ActionKind, ActionProcessor, ActionType, Invocation, Result};
/// use async_trait::async_trait;
///
/// struct VibrateProcessor;
///
/// #[async_trait]
/// impl ActionProcessor for VibrateProcessor {
///     fn action_type(&self) -> ActionType {
///         ActionType::custom("vibrate")
///     }
///
///     fn description(&self) -> &str {
///         "Vibrate the device"
///     }
///
///     async fn execute(&self, action: &Action, inv: &Invocation<'_>) -> Result<()> {
///         let ActionKind::Custom { fields, .. } = &action.kind else {
///             return Err(unexpected_action(self.action_type(), action));
///         };
///         tracing::info!(pattern = ?fields.get("pattern"), "bzzz");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait ActionProcessor: Send + Sync {
    /// The action type this processor handles
    fn action_type(&self) -> ActionType;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Run one action
    ///
    /// May suspend; the flow does not advance until this returns.
    async fn execute(&self, action: &Action, inv: &Invocation<'_>) -> Result<()>;

    /// Timeout applied when the executor has none configured
    fn default_timeout(&self) -> Option<Duration> {
        None
    }
}

/// Everything a processor gets for one run
#[derive(Clone, Copy)]
pub struct Invocation<'a> {
    /// Host collaborators
    pub context: &'a ActionContext,

    /// Evaluation scope; state is visible through it
    pub scope: &'a ScopeContext,

    /// State region the flow was launched against
    pub state: Option<&'a Arc<StateContext>>,

    /// Correlation id of the whole flow
    pub execution_id: &'a str,

    /// Correlation id of this action, fresh per dispatch
    pub action_id: &'a str,

    /// Executor running the flow, for nested flows
    pub executor: &'a ActionExecutor,
}

impl Invocation<'_> {
    /// Evaluate an `ExprOr` field against the scope
    pub fn evaluate<T: FromDynamic + Clone>(&self, value: &ExprOr<T>) -> Option<T> {
        value.evaluate(Some(self.scope))
    }

    /// Evaluate a required field
    pub fn require<T: FromDynamic + Clone>(&self, value: &ExprOr<T>, field: &str) -> Result<T> {
        self.evaluate(value).ok_or_else(|| {
            ActionError::InvalidParameters(format!("'{field}' evaluated to nothing usable"))
        })
    }

    /// Evaluate every expression inside a document value
    pub fn evaluate_nested(&self, value: &Value) -> Value {
        evaluate_nested_expressions(value, Some(self.scope))
    }

    /// Resolve the state region an action targets
    ///
    /// `None` targets the flow's own region. A name walks up the region
    /// chain; `appState` falls back to the app state region.
    pub fn target_state(&self, name: Option<&str>) -> Result<Arc<StateContext>> {
        match name {
            None => self.state.cloned().ok_or_else(|| {
                ActionError::StateContextNotFound("flow has no state context".to_string())
            }),
            Some(name) => self
                .state
                .and_then(|state| state.find(name))
                .or_else(|| {
                    (name == APP_STATE_NAMESPACE).then(|| self.context.app_state().clone())
                })
                .ok_or_else(|| ActionError::StateContextNotFound(name.to_string())),
        }
    }

    /// Run a nested flow with extra bindings in scope
    ///
    /// Nested flows share the execution id and state of this invocation.
    pub async fn run_nested<I>(&self, flow: Option<&ActionFlow>, bindings: I)
    where
        I: IntoIterator<Item = (&'static str, Value)>,
    {
        let Some(flow) = flow else {
            return;
        };
        let scope = self.scope.copy_and_extend(bindings);
        self.executor
            .execute_nested(self.context, flow, scope, self.state, self.execution_id)
            .await;
    }
}

impl std::fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("scope", self.scope)
            .field("state", &self.state.map(|s| s.namespace()))
            .field("execution_id", &self.execution_id)
            .field("action_id", &self.action_id)
            .finish()
    }
}

/// Error for a processor handed an action of another type
pub fn unexpected_action(expected: ActionType, action: &Action) -> ActionError {
    ActionError::ExecutionFailed(format!(
        "{expected} processor received a {} action",
        action.action_type()
    ))
}
