//! PostMessage action

use crate::action::{Action, ActionKind, ActionType};
use crate::bus::Message;
use crate::error::Result;
use crate::processor::{unexpected_action, ActionProcessor, Invocation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sprig_expr::ExprOr;
use tracing::debug;

/// Publish on the message bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessage {
    /// Channel name
    pub name: ExprOr<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

/// Sends to current subscribers only; the execution id is the origin
pub struct PostMessageProcessor;

#[async_trait]
impl ActionProcessor for PostMessageProcessor {
    fn action_type(&self) -> ActionType {
        ActionType::PostMessage
    }

    fn description(&self) -> &str {
        "Publish a message on a bus channel"
    }

    async fn execute(&self, action: &Action, inv: &Invocation<'_>) -> Result<()> {
        let ActionKind::PostMessage(post) = &action.kind else {
            return Err(unexpected_action(self.action_type(), action));
        };
        let name = inv.require(&post.name, "name")?;
        let payload = inv.evaluate_nested(&post.payload);

        let delivered = inv
            .context
            .bus()
            .send(Message::new(name.clone(), payload).with_origin(inv.execution_id));
        debug!(channel = %name, delivered, "Posted message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::actions::testing::Harness;
    use serde_json::json;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_post_message() {
        let harness = Harness::new();
        harness.state.set("x", json!(2), false);
        let mut done = harness.ctx.bus().observe("done");

        harness
            .run(json!({"type": "postMessage", "name": "done", "payload": "@{x}"}))
            .await
            .unwrap();

        let message = done.next().await.unwrap();
        assert_eq!(message.payload, json!(2));
        assert_eq!(message.origin.as_deref(), Some("exec-test"));
    }

    #[tokio::test]
    async fn test_post_without_subscribers_succeeds() {
        let harness = Harness::new();
        harness
            .run(json!({"type": "postMessage", "name": "nobody"}))
            .await
            .unwrap();
        assert_eq!(harness.ctx.bus().channel_count(), 0);
    }
}
