//! Delay action

use crate::action::{Action, ActionKind, ActionType};
use crate::error::Result;
use crate::processor::{unexpected_action, ActionProcessor, Invocation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sprig_expr::ExprOr;
use std::time::Duration;
use tracing::debug;

/// Suspend the flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delay {
    /// Milliseconds; negative or unusable values mean no wait
    pub duration_in_ms: ExprOr<i64>,
}

pub struct DelayProcessor;

#[async_trait]
impl ActionProcessor for DelayProcessor {
    fn action_type(&self) -> ActionType {
        ActionType::Delay
    }

    fn description(&self) -> &str {
        "Wait before running the next action"
    }

    async fn execute(&self, action: &Action, inv: &Invocation<'_>) -> Result<()> {
        let ActionKind::Delay(delay) = &action.kind else {
            return Err(unexpected_action(self.action_type(), action));
        };
        let millis = inv.evaluate(&delay.duration_in_ms).unwrap_or(0).max(0) as u64;
        debug!(millis, "Delaying flow");
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::actions::testing::Harness;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_delay_suspends() {
        let harness = Harness::new().with_var("wait", json!(250));
        let start = Instant::now();
        harness
            .run(json!({"type": "delay", "durationInMs": "@{wait}"}))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_negative_delay_is_immediate() {
        let harness = Harness::new();
        let start = Instant::now();
        harness
            .run(json!({"type": "delay", "durationInMs": -50}))
            .await
            .unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
