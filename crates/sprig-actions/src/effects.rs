//! Platform side effects
//!
//! Processors never show toasts, navigate or open sockets themselves. They
//! describe the side effect as an [`Effect`] and hand it to the host's
//! [`EffectHandler`]. The handler's return value carries results back into
//! the flow (a dialog result, an HTTP response).

use crate::error::{ActionError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sprig_expr::dynamic_enum;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// How long a transient message stays on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastDuration {
    #[default]
    Short,
    Long,
}

dynamic_enum!(ToastDuration { Short => "short", Long => "long" });

/// Where an external URL is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UrlLaunchMode {
    #[default]
    PlatformDefault,
    InAppWebView,
    ExternalApplication,
}

dynamic_enum!(UrlLaunchMode {
    PlatformDefault => "platformDefault",
    InAppWebView => "inAppWebView",
    ExternalApplication => "externalApplication",
});

/// Presentation of a modal view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModalKind {
    Dialog,
    BottomSheet,
}

/// HTTP verbs for network calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

dynamic_enum!(HttpMethod {
    Get => "GET",
    Post => "POST",
    Put => "PUT",
    Patch => "PATCH",
    Delete => "DELETE",
});

/// A side effect requested by a processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "camelCase")]
pub enum Effect {
    #[serde(rename_all = "camelCase")]
    ShowToast {
        message: String,
        duration: ToastDuration,
    },
    #[serde(rename_all = "camelCase")]
    CopyToClipboard { text: String },
    #[serde(rename_all = "camelCase")]
    Share {
        message: String,
        subject: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    NavigateToPage {
        page_id: String,
        args: Value,
        replace: bool,
    },
    #[serde(rename_all = "camelCase")]
    NavigateBack { result: Value },
    #[serde(rename_all = "camelCase")]
    ShowModal {
        kind: ModalKind,
        view_id: String,
        args: Value,
        barrier_dismissible: bool,
    },
    #[serde(rename_all = "camelCase")]
    OpenUrl {
        url: String,
        launch_mode: UrlLaunchMode,
    },
    #[serde(rename_all = "camelCase")]
    HttpRequest {
        method: HttpMethod,
        url: String,
        headers: Value,
        body: Value,
    },
    #[serde(rename_all = "camelCase")]
    FireEvent { name: String, payload: Value },
}

impl Effect {
    /// Short name of the effect kind
    pub fn kind(&self) -> &'static str {
        match self {
            Effect::ShowToast { .. } => "showToast",
            Effect::CopyToClipboard { .. } => "copyToClipboard",
            Effect::Share { .. } => "share",
            Effect::NavigateToPage { .. } => "navigateToPage",
            Effect::NavigateBack { .. } => "navigateBack",
            Effect::ShowModal { .. } => "showModal",
            Effect::OpenUrl { .. } => "openUrl",
            Effect::HttpRequest { .. } => "httpRequest",
            Effect::FireEvent { .. } => "fireEvent",
        }
    }
}

/// Host capability that performs side effects
///
/// `perform` may suspend (a dialog waiting for the user, a network call);
/// the flow waits for it before moving to the next action.
#[async_trait]
pub trait EffectHandler: Send + Sync {
    /// Perform the effect and return its result (null when it has none)
    ///
    /// For [`Effect::HttpRequest`] the result is an object with
    /// `statusCode`, `headers` and `body`.
    async fn perform(&self, effect: Effect) -> Result<Value>;
}

/// An effect handler that does nothing
#[derive(Debug, Default, Clone)]
pub struct NoopEffects;

#[async_trait]
impl EffectHandler for NoopEffects {
    async fn perform(&self, _effect: Effect) -> Result<Value> {
        Ok(Value::Null)
    }
}

/// An effect handler that records every effect
///
/// Canned results and failures can be set per effect kind.
#[derive(Debug, Default)]
pub struct RecordingEffects {
    effects: Mutex<Vec<Effect>>,
    responses: HashMap<&'static str, Value>,
    failures: HashMap<&'static str, String>,
}

impl RecordingEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `result` for every effect of `kind`
    pub fn with_response(mut self, kind: &'static str, result: Value) -> Self {
        self.responses.insert(kind, result);
        self
    }

    /// Fail every effect of `kind` with `message`
    pub fn with_failure(mut self, kind: &'static str, message: impl Into<String>) -> Self {
        self.failures.insert(kind, message.into());
        self
    }

    pub fn effects(&self) -> Vec<Effect> {
        self.effects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded effects of one kind
    pub fn of_kind(&self, kind: &str) -> Vec<Effect> {
        self.effects()
            .into_iter()
            .filter(|effect| effect.kind() == kind)
            .collect()
    }

    pub fn clear(&self) {
        self.effects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl EffectHandler for RecordingEffects {
    async fn perform(&self, effect: Effect) -> Result<Value> {
        let kind = effect.kind();
        self.effects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(effect);
        if let Some(message) = self.failures.get(kind) {
            return Err(ActionError::EffectFailed(message.clone()));
        }
        Ok(self.responses.get(kind).cloned().unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sprig_expr::FromDynamic;

    #[test]
    fn test_vocabulary_coercion() {
        assert_eq!(
            ToastDuration::from_dynamic(&json!("LONG")),
            Some(ToastDuration::Long)
        );
        assert_eq!(
            UrlLaunchMode::from_dynamic(&json!("externalapplication")),
            Some(UrlLaunchMode::ExternalApplication)
        );
        assert_eq!(HttpMethod::from_dynamic(&json!("post")), Some(HttpMethod::Post));
        assert_eq!(HttpMethod::from_dynamic(&json!("TRACE")), None);
    }

    #[test]
    fn test_effect_serialization() {
        let effect = Effect::ShowToast {
            message: "hi".to_string(),
            duration: ToastDuration::Long,
        };
        let value = serde_json::to_value(&effect).unwrap();
        assert_eq!(
            value,
            json!({"effect": "showToast", "message": "hi", "duration": "long"})
        );
        assert_eq!(serde_json::from_value::<Effect>(value).unwrap(), effect);

        let effect = Effect::NavigateToPage {
            page_id: "home".to_string(),
            args: json!({}),
            replace: false,
        };
        assert_eq!(
            serde_json::to_value(&effect).unwrap()["pageId"],
            json!("home")
        );
    }

    #[tokio::test]
    async fn test_noop_effects() {
        let result = NoopEffects
            .perform(Effect::CopyToClipboard {
                text: "x".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(result, Value::Null);
    }

    #[tokio::test]
    async fn test_recording_effects() {
        let effects = RecordingEffects::new()
            .with_response("showModal", json!("confirmed"))
            .with_failure("openUrl", "no browser");

        let result = effects
            .perform(Effect::ShowModal {
                kind: ModalKind::Dialog,
                view_id: "confirm".to_string(),
                args: Value::Null,
                barrier_dismissible: true,
            })
            .await
            .unwrap();
        assert_eq!(result, json!("confirmed"));

        let err = effects
            .perform(Effect::OpenUrl {
                url: "https://example.com".to_string(),
                launch_mode: UrlLaunchMode::PlatformDefault,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no browser"));

        assert_eq!(effects.effects().len(), 2);
        assert_eq!(effects.of_kind("openUrl").len(), 1);

        effects.clear();
        assert!(effects.effects().is_empty());
    }
}
