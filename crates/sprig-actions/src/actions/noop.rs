//! Noop action

use crate::action::{Action, ActionType};
use crate::error::Result;
use crate::processor::{ActionProcessor, Invocation};
use async_trait::async_trait;
use tracing::debug;

/// Does nothing
///
/// Also runs steps whose type has no processor under the fallback policy.
pub struct NoopProcessor;

#[async_trait]
impl ActionProcessor for NoopProcessor {
    fn action_type(&self) -> ActionType {
        ActionType::Noop
    }

    fn description(&self) -> &str {
        "Do nothing"
    }

    async fn execute(&self, action: &Action, inv: &Invocation<'_>) -> Result<()> {
        debug!(action_id = %inv.action_id, action_type = %action.action_type(), "No-op");
        Ok(())
    }
}
