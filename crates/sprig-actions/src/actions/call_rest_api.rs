//! CallRestApi action
//!
//! The request goes out through the host's `httpRequest` effect. A 2xx
//! response runs `onSuccess` with `response` bound; anything else runs
//! `onError` with `response` (when there is one) and `error` bound. Without
//! an `onError` flow, a failed call fails the step.

use crate::action::{Action, ActionKind, ActionType};
use crate::effects::{Effect, HttpMethod};
use crate::error::{ActionError, Result};
use crate::flow::{optional_flow, ActionFlow};
use crate::processor::{unexpected_action, ActionProcessor, Invocation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sprig_expr::ExprOr;
use tracing::{debug, warn};

/// Request description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<ExprOr<HttpMethod>>,
    pub url: ExprOr<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub headers: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub body: Value,
}

/// Make a network call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRestApi {
    pub data_source: DataSource,
    #[serde(
        default,
        deserialize_with = "optional_flow",
        skip_serializing_if = "Option::is_none"
    )]
    pub on_success: Option<ActionFlow>,
    #[serde(
        default,
        deserialize_with = "optional_flow",
        skip_serializing_if = "Option::is_none"
    )]
    pub on_error: Option<ActionFlow>,
}

/// Status code of an `httpRequest` result; a bare result counts as 200
fn status_code(response: &Value) -> u64 {
    response
        .get("statusCode")
        .and_then(Value::as_u64)
        .unwrap_or(200)
}

pub struct CallRestApiProcessor;

#[async_trait]
impl ActionProcessor for CallRestApiProcessor {
    fn action_type(&self) -> ActionType {
        ActionType::CallRestApi
    }

    fn description(&self) -> &str {
        "Call a REST endpoint"
    }

    async fn execute(&self, action: &Action, inv: &Invocation<'_>) -> Result<()> {
        let ActionKind::CallRestApi(call) = &action.kind else {
            return Err(unexpected_action(self.action_type(), action));
        };
        let source = &call.data_source;
        let url = inv.require(&source.url, "dataSource.url")?;
        let method = source
            .method
            .as_ref()
            .and_then(|m| inv.evaluate(m))
            .unwrap_or_default();
        let effect = Effect::HttpRequest {
            method,
            url: url.clone(),
            headers: inv.evaluate_nested(&source.headers),
            body: inv.evaluate_nested(&source.body),
        };

        debug!(method = method.as_str(), url = %url, "Calling REST endpoint");
        let (response, error) = match inv.context.perform(effect).await {
            Ok(response) => {
                let status = status_code(&response);
                if (200..300).contains(&status) {
                    inv.run_nested(call.on_success.as_ref(), [("response", response)])
                        .await;
                    return Ok(());
                }
                (response, format!("{url} returned status {status}"))
            }
            Err(e) => (Value::Null, e.to_string()),
        };

        warn!(url = %url, error = %error, "REST call failed");
        match &call.on_error {
            Some(on_error) => {
                inv.run_nested(
                    Some(on_error),
                    [("response", response), ("error", Value::String(error))],
                )
                .await;
                Ok(())
            }
            None => Err(ActionError::EffectFailed(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::Harness;
    use crate::effects::RecordingEffects;
    use serde_json::json;

    fn call(with_on_error: bool) -> Value {
        let mut call = json!({
            "type": "Action.callRestApi",
            "dataSource": {
                "method": "post",
                "url": "https://api.example.com/users/@{id}",
                "headers": {"Authorization": "Bearer @{token}"},
                "body": {"id": "@{id}"},
            },
            "onSuccess": {"steps": [{
                "type": "setState",
                "updates": [{"stateName": "name", "newValue": "@{response.body.name}"}],
            }]},
        });
        if with_on_error {
            call["onError"] = json!({"steps": [{
                "type": "setState",
                "updates": [
                    {"stateName": "error", "newValue": "@{error}"},
                    {"stateName": "status", "newValue": "@{response.statusCode}"},
                ],
            }]});
        }
        call
    }

    #[tokio::test]
    async fn test_success_runs_on_success() {
        let harness = Harness::with_effects(RecordingEffects::new().with_response(
            "httpRequest",
            json!({"statusCode": 201, "headers": {}, "body": {"name": "Ada"}}),
        ))
        .with_var("id", json!(7))
        .with_var("token", json!("t0k"));

        harness.run(call(true)).await.unwrap();

        assert_eq!(harness.state.get("name"), Some(json!("Ada")));
        assert_eq!(harness.state.get("error"), None);
        assert_eq!(
            harness.effects.of_kind("httpRequest")[0],
            Effect::HttpRequest {
                method: HttpMethod::Post,
                url: "https://api.example.com/users/7".to_string(),
                headers: json!({"Authorization": "Bearer t0k"}),
                body: json!({"id": 7}),
            }
        );
    }

    #[tokio::test]
    async fn test_error_status_runs_on_error() {
        let harness = Harness::with_effects(
            RecordingEffects::new().with_response("httpRequest", json!({"statusCode": 404})),
        )
        .with_var("id", json!(7));

        harness.run(call(true)).await.unwrap();

        assert_eq!(harness.state.get("name"), None);
        assert_eq!(harness.state.get("status"), Some(json!(404)));
        let error = harness.state.get("error").unwrap();
        assert!(error.as_str().unwrap().contains("404"));
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let failing = || RecordingEffects::new().with_failure("httpRequest", "connection refused");

        let harness = Harness::with_effects(failing()).with_var("id", json!(7));
        harness.run(call(true)).await.unwrap();
        let error = harness.state.get("error").unwrap();
        assert!(error.as_str().unwrap().contains("connection refused"));
        assert_eq!(harness.state.get("status"), Some(Value::Null));

        let harness = Harness::with_effects(failing()).with_var("id", json!(7));
        let err = harness.run(call(false)).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }
}
