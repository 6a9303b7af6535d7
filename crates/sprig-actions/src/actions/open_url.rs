//! OpenUrl action

use crate::action::{Action, ActionKind, ActionType};
use crate::effects::{Effect, UrlLaunchMode};
use crate::error::Result;
use crate::processor::{unexpected_action, ActionProcessor, Invocation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sprig_expr::ExprOr;

/// Open an external URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenUrl {
    pub url: ExprOr<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_mode: Option<ExprOr<UrlLaunchMode>>,
}

pub struct OpenUrlProcessor;

#[async_trait]
impl ActionProcessor for OpenUrlProcessor {
    fn action_type(&self) -> ActionType {
        ActionType::OpenUrl
    }

    fn description(&self) -> &str {
        "Open an external URL"
    }

    async fn execute(&self, action: &Action, inv: &Invocation<'_>) -> Result<()> {
        let ActionKind::OpenUrl(open) = &action.kind else {
            return Err(unexpected_action(self.action_type(), action));
        };
        let url = inv.require(&open.url, "url")?;
        let launch_mode = open
            .launch_mode
            .as_ref()
            .and_then(|mode| inv.evaluate(mode))
            .unwrap_or_default();

        inv.context
            .perform(Effect::OpenUrl { url, launch_mode })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::Harness;
    use serde_json::json;

    #[tokio::test]
    async fn test_open_url() {
        let harness = Harness::new().with_var("slug", json!("docs"));
        harness
            .run(json!({
                "type": "openUrl",
                "url": "https://example.com/@{slug}",
                "launchMode": "externalApplication",
            }))
            .await
            .unwrap();

        assert_eq!(
            harness.effects.effects(),
            vec![Effect::OpenUrl {
                url: "https://example.com/docs".to_string(),
                launch_mode: UrlLaunchMode::ExternalApplication,
            }]
        );
    }
}
