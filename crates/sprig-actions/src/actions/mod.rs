//! Built-in action kinds
//!
//! Each module holds the fields of one action kind and the processor that
//! runs it.
//!
//! # Available Actions
//!
//! - `showToast` - transient message
//! - `setState` / `rebuildState` - write or flush a state region
//! - `setAppState` - write the app state region
//! - `navigateToPage` / `navigateBack` - page navigation
//! - `showDialog` / `showBottomSheet` - modal views with a result flow
//! - `callRestApi` - network call with success and error flows
//! - `openUrl`, `share`, `copyToClipBoard`, `fireEvent` - platform effects
//! - `controlObject` - call a method on a named object
//! - `delay` - suspend the flow
//! - `postMessage` - publish on the message bus
//! - `noop` - does nothing

mod call_rest_api;
mod control_object;
mod copy_to_clipboard;
mod delay;
mod fire_event;
mod modal;
mod navigate;
mod noop;
mod open_url;
mod post_message;
mod rebuild_state;
mod set_app_state;
mod set_state;
mod share;
mod show_toast;

pub use call_rest_api::{CallRestApi, CallRestApiProcessor, DataSource};
pub use control_object::{ControlObject, ControlObjectProcessor};
pub use copy_to_clipboard::{CopyToClipboard, CopyToClipboardProcessor};
pub use delay::{Delay, DelayProcessor};
pub use fire_event::{FireEvent, FireEventProcessor};
pub use modal::{ShowBottomSheetProcessor, ShowDialogProcessor, ShowModal};
pub use navigate::{NavigateBack, NavigateBackProcessor, NavigateToPage, NavigateToPageProcessor};
pub use noop::NoopProcessor;
pub use open_url::{OpenUrl, OpenUrlProcessor};
pub use post_message::{PostMessage, PostMessageProcessor};
pub use rebuild_state::{RebuildState, RebuildStateProcessor};
pub use set_app_state::{SetAppState, SetAppStateProcessor};
pub use set_state::{SetState, SetStateProcessor, StateUpdate};
pub use share::{Share, ShareProcessor};
pub use show_toast::{ShowToast, ShowToastProcessor};

use crate::registry::ActionRegistry;

/// Register every built-in processor
pub fn register_all(registry: &mut ActionRegistry) {
    registry.register(ShowToastProcessor);
    registry.register(SetStateProcessor);
    registry.register(RebuildStateProcessor);
    registry.register(NavigateToPageProcessor);
    registry.register(NavigateBackProcessor);
    registry.register(ShowDialogProcessor);
    registry.register(ShowBottomSheetProcessor);
    registry.register(CallRestApiProcessor);
    registry.register(OpenUrlProcessor);
    registry.register(SetAppStateProcessor);
    registry.register(ControlObjectProcessor);
    registry.register(ShareProcessor);
    registry.register(DelayProcessor);
    registry.register(CopyToClipboardProcessor);
    registry.register(PostMessageProcessor);
    registry.register(FireEventProcessor);
    registry.register(NoopProcessor);
}

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::action::Action;
    use crate::context::ActionContext;
    use crate::effects::RecordingEffects;
    use crate::error::{ActionError, Result};
    use crate::executor::{flow_scope, ActionExecutor};
    use crate::processor::Invocation;
    use crate::registry::ActionRegistry;
    use crate::state::StateContext;
    use serde_json::Value;
    use sprig_expr::ScopeContext;
    use std::sync::Arc;

    /// Runs single steps straight through their processor
    pub(crate) struct Harness {
        pub executor: ActionExecutor,
        pub ctx: ActionContext,
        pub effects: Arc<RecordingEffects>,
        pub state: Arc<StateContext>,
        pub scope: ScopeContext,
    }

    impl Harness {
        pub fn new() -> Self {
            Self::with_effects(RecordingEffects::new())
        }

        pub fn with_effects(effects: RecordingEffects) -> Self {
            let effects = Arc::new(effects);
            Self {
                executor: ActionExecutor::new(ActionRegistry::with_builtins()).unwrap(),
                ctx: ActionContext::new().with_effects(effects.clone()),
                effects,
                state: Arc::new(StateContext::new("page")),
                scope: ScopeContext::new("test"),
            }
        }

        pub fn with_var(mut self, key: &str, value: Value) -> Self {
            self.scope = self.scope.with_var(key, value);
            self
        }

        pub async fn run(&self, step: Value) -> Result<()> {
            let action = Action::from_json(&step)?;
            let processor = self
                .executor
                .registry()
                .get(&action.action_type())
                .cloned()
                .ok_or_else(|| ActionError::UnsupportedType(action.action_type().tag()))?;
            let scope = flow_scope(&self.ctx, Some(&self.scope), Some(&self.state));
            let invocation = Invocation {
                context: &self.ctx,
                scope: &scope,
                state: Some(&self.state),
                execution_id: "exec-test",
                action_id: "action-test",
                executor: &self.executor,
            };
            processor.execute(&action, &invocation).await
        }
    }
}
