//! Action flow executor
//!
//! Runs the steps of a flow one after another. Per step:
//!
//! 1. Assign a fresh action id
//! 2. Skip the step if `disableActionIf` evaluates to true
//! 3. Resolve the processor for its type
//! 4. Run the processor, applying the configured timeout
//! 5. Log and report a failure, then carry on with the next step
//!
//! A failed step never aborts the flow. [`ActionExecutor::execute`] returns
//! once every step has been attempted; progress is published as
//! [`ExecutionEvent`]s.

use crate::action::{Action, ActionType};
use crate::config::{ExecutorConfig, UnknownActionPolicy};
use crate::context::ActionContext;
use crate::error::{ActionError, Result};
use crate::flow::{ActionFlow, ParseOptions};
use crate::processor::{ActionProcessor, Invocation};
use crate::state::{StateContext, APP_STATE_NAMESPACE};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use sprig_expr::{ScopeContext, VariableSource};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Events emitted while a flow runs
///
/// Steps of nested flows report under the execution id of the flow that
/// launched them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ExecutionEvent {
    /// Flow started
    #[serde(rename_all = "camelCase")]
    FlowStarted { execution_id: String, steps: usize },
    /// Step skipped: disabled, or unknown under the drop policy
    #[serde(rename_all = "camelCase")]
    ActionSkipped {
        execution_id: String,
        action_id: String,
        action_type: String,
        index: usize,
    },
    /// Step handed to its processor
    #[serde(rename_all = "camelCase")]
    ActionStarted {
        execution_id: String,
        action_id: String,
        action_type: String,
        index: usize,
    },
    /// Processor returned successfully
    #[serde(rename_all = "camelCase")]
    ActionCompleted {
        execution_id: String,
        action_id: String,
        action_type: String,
        index: usize,
        duration_ms: u64,
    },
    /// Processor failed or timed out
    #[serde(rename_all = "camelCase")]
    ActionFailed {
        execution_id: String,
        action_id: String,
        action_type: String,
        index: usize,
        error: String,
    },
    /// Every step attempted
    #[serde(rename_all = "camelCase")]
    FlowCompleted {
        execution_id: String,
        summary: FlowSummary,
    },
}

/// Step counts of a finished flow
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSummary {
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Default, Clone, Copy)]
struct StepCounts {
    completed: usize,
    failed: usize,
    skipped: usize,
}

impl StepCounts {
    fn add(&mut self, other: StepCounts) {
        self.completed += other.completed;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

/// Runs action flows
///
/// Built from a complete [`crate::ActionRegistry`]; construction fails if
/// any built-in type lacks a processor.
///
/// # Example
///
/// ```ignore
/// use sprig_actions::{ActionContext, ActionExecutor, ActionFlow, ActionRegistry};
///
/// let executor = ActionExecutor::new(ActionRegistry::with_builtins())?;
/// let flow = ActionFlow::from_json(&document).unwrap_or_default();
/// executor.execute(&ActionContext::new(), &flow, None, None).await;
/// ```
pub struct ActionExecutor {
    registry: crate::registry::ActionRegistry,
    config: ExecutorConfig,
    event_sender: broadcast::Sender<ExecutionEvent>,
}

impl ActionExecutor {
    /// Create an executor with the default configuration
    pub fn new(registry: crate::registry::ActionRegistry) -> Result<Self> {
        Self::with_config(registry, ExecutorConfig::default())
    }

    /// Create an executor
    pub fn with_config(
        registry: crate::registry::ActionRegistry,
        config: ExecutorConfig,
    ) -> Result<Self> {
        config.validate()?;
        registry.validate()?;
        let (event_sender, _) = broadcast::channel(config.event_capacity);
        Ok(Self {
            registry,
            config,
            event_sender,
        })
    }

    /// Subscribe to execution events
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.event_sender.subscribe()
    }

    pub fn registry(&self) -> &crate::registry::ActionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Parser settings matching this executor
    pub fn parse_options(&self) -> ParseOptions {
        let mut options = ParseOptions::new(self.config.unknown_actions);
        options
            .custom_types
            .extend(self.registry.custom_types().cloned());
        options
    }

    /// Parse a flow document with this executor's settings
    pub fn parse_flow(&self, document: &Value) -> Option<ActionFlow> {
        ActionFlow::from_json_with(document, &self.parse_options())
    }

    /// Run a flow to completion
    ///
    /// Expressions see the caller's `scope` first, then `state` (and its
    /// ancestors), then the app state under `appState`.
    pub async fn execute(
        &self,
        ctx: &ActionContext,
        flow: &ActionFlow,
        scope: Option<&ScopeContext>,
        state: Option<&Arc<StateContext>>,
    ) {
        let execution_id = Uuid::new_v4().to_string();
        let span = info_span!("action_flow", execution_id = %execution_id);

        async {
            let started_at = Utc::now();
            info!(steps = flow.len(), "Starting action flow");
            let _ = self.event_sender.send(ExecutionEvent::FlowStarted {
                execution_id: execution_id.clone(),
                steps: flow.len(),
            });

            let scope = flow_scope(ctx, scope, state);
            let counts = self
                .run_steps(ctx, flow, &scope, state, &execution_id)
                .await;

            let summary = FlowSummary {
                completed: counts.completed,
                failed: counts.failed,
                skipped: counts.skipped,
                started_at,
                finished_at: Utc::now(),
            };
            info!(
                completed = summary.completed,
                failed = summary.failed,
                skipped = summary.skipped,
                "Action flow finished"
            );
            let _ = self.event_sender.send(ExecutionEvent::FlowCompleted {
                execution_id: execution_id.clone(),
                summary,
            });
        }
        .instrument(span)
        .await
    }

    /// Run a flow nested inside a running step
    pub fn execute_nested<'a>(
        &'a self,
        ctx: &'a ActionContext,
        flow: &'a ActionFlow,
        scope: ScopeContext,
        state: Option<&'a Arc<StateContext>>,
        execution_id: &'a str,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            debug!(steps = flow.len(), "Running nested flow");
            self.run_steps(ctx, flow, &scope, state, execution_id).await;
        })
    }

    async fn run_steps(
        &self,
        ctx: &ActionContext,
        flow: &ActionFlow,
        scope: &ScopeContext,
        state: Option<&Arc<StateContext>>,
        execution_id: &str,
    ) -> StepCounts {
        let mut counts = StepCounts::default();
        for (index, action) in flow.iter().enumerate() {
            let step = self
                .run_step(ctx, index, action, scope, state, execution_id)
                .await;
            counts.add(step);
        }
        counts
    }

    async fn run_step(
        &self,
        ctx: &ActionContext,
        index: usize,
        action: &Action,
        scope: &ScopeContext,
        state: Option<&Arc<StateContext>>,
        execution_id: &str,
    ) -> StepCounts {
        let action_id = Uuid::new_v4().to_string();
        let action_type = action.action_type();
        let type_name = action_type.to_string();

        let skipped = StepCounts {
            skipped: 1,
            ..Default::default()
        };
        if action.is_disabled(scope) {
            debug!(action_id = %action_id, action_type = %type_name, index, "Action disabled, skipping");
            self.emit_skipped(execution_id, &action_id, &type_name, index);
            return skipped;
        }
        let Some(processor) = self.resolve(&action_type) else {
            self.emit_skipped(execution_id, &action_id, &type_name, index);
            return skipped;
        };

        debug!(action_id = %action_id, action_type = %type_name, index, "Running action");
        let _ = self.event_sender.send(ExecutionEvent::ActionStarted {
            execution_id: execution_id.to_string(),
            action_id: action_id.clone(),
            action_type: type_name.clone(),
            index,
        });

        let invocation = Invocation {
            context: ctx,
            scope,
            state,
            execution_id,
            action_id: &action_id,
            executor: self,
        };
        let start = Instant::now();
        let timeout = processor.default_timeout().or(self.config.action_timeout());
        let result = match timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, processor.execute(action, &invocation)).await {
                    Ok(result) => result,
                    Err(_) => Err(ActionError::Timeout(limit)),
                }
            }
            None => processor.execute(action, &invocation).await,
        };
        let elapsed = start.elapsed();

        match result {
            Ok(()) => {
                debug!(action_id = %action_id, action_type = %type_name, ?elapsed, "Action completed");
                let _ = self.event_sender.send(ExecutionEvent::ActionCompleted {
                    execution_id: execution_id.to_string(),
                    action_id,
                    action_type: type_name,
                    index,
                    duration_ms: elapsed.as_millis() as u64,
                });
                StepCounts {
                    completed: 1,
                    ..Default::default()
                }
            }
            Err(e) => {
                error!(action_id = %action_id, action_type = %type_name, index, error = %e, "Action failed");
                let _ = self.event_sender.send(ExecutionEvent::ActionFailed {
                    execution_id: execution_id.to_string(),
                    action_id,
                    action_type: type_name,
                    index,
                    error: e.to_string(),
                });
                StepCounts {
                    failed: 1,
                    ..Default::default()
                }
            }
        }
    }

    /// Processor for a type, applying the unknown action policy
    fn resolve(&self, action_type: &ActionType) -> Option<Arc<dyn ActionProcessor>> {
        if let Some(processor) = self.registry.get(action_type) {
            return Some(processor.clone());
        }
        match self.config.unknown_actions {
            UnknownActionPolicy::Fallback => {
                warn!(action_type = %action_type, "No processor for action type, running as no-op");
                self.registry.get(&ActionType::Noop).cloned()
            }
            UnknownActionPolicy::Drop => {
                warn!(action_type = %action_type, "No processor for action type, dropping");
                None
            }
        }
    }

    fn emit_skipped(&self, execution_id: &str, action_id: &str, action_type: &str, index: usize) {
        let _ = self.event_sender.send(ExecutionEvent::ActionSkipped {
            execution_id: execution_id.to_string(),
            action_id: action_id.to_string(),
            action_type: action_type.to_string(),
            index,
        });
    }
}

impl std::fmt::Debug for ActionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

/// Variables visible to a flow's expressions
struct FlowVariables {
    caller: Option<ScopeContext>,
    state: Option<Arc<StateContext>>,
    app_state: Arc<StateContext>,
}

impl VariableSource for FlowVariables {
    fn lookup(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.caller.as_ref().and_then(|scope| scope.get_value(key)) {
            return Some(value);
        }
        if let Some(value) = self.state.as_ref().and_then(|state| state.lookup(key)) {
            return Some(value);
        }
        (key == APP_STATE_NAMESPACE).then(|| Value::Object(self.app_state.values()))
    }
}

pub(crate) fn flow_scope(
    ctx: &ActionContext,
    caller: Option<&ScopeContext>,
    state: Option<&Arc<StateContext>>,
) -> ScopeContext {
    let variables = FlowVariables {
        caller: caller.cloned(),
        state: state.cloned(),
        app_state: ctx.app_state().clone(),
    };
    ScopeContext::new("flow").with_source(Arc::new(variables))
}
