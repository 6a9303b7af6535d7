//! Action model
//!
//! An [`Action`] is one parsed step of a flow: a typed [`ActionKind`] plus
//! the optional `disableActionIf` condition every step may carry. Parsing
//! dispatches on the descriptor's `type` tag; tags are matched without
//! regard to case and the `Action.` prefix is optional.

use crate::actions::{
    CallRestApi, ControlObject, CopyToClipboard, Delay, FireEvent, NavigateBack,
    NavigateToPage, OpenUrl, PostMessage, RebuildState, SetAppState, SetState, Share,
    ShowModal, ShowToast,
};
use crate::error::{ActionError, Result};
use crate::flow::ActionFlow;
use serde::de::DeserializeOwned;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use sprig_expr::{ExprOr, ScopeContext};
use std::fmt;

const TAG_PREFIX: &str = "Action.";
const TYPE_KEY: &str = "type";
const DISABLE_KEY: &str = "disableActionIf";

/// Type tag of an action
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionType {
    ShowToast,
    SetState,
    RebuildState,
    NavigateToPage,
    NavigateBack,
    ShowDialog,
    ShowBottomSheet,
    CallRestApi,
    OpenUrl,
    SetAppState,
    ControlObject,
    Share,
    Delay,
    CopyToClipboard,
    PostMessage,
    FireEvent,
    /// Does nothing; also the classification for unknown tags under the
    /// fallback policy
    Noop,
    /// A tag registered by the host, stored lowercased without prefix
    Custom(String),
}

impl ActionType {
    /// Every type the executor must have a processor for
    pub const BUILTIN: &'static [ActionType] = &[
        ActionType::ShowToast,
        ActionType::SetState,
        ActionType::RebuildState,
        ActionType::NavigateToPage,
        ActionType::NavigateBack,
        ActionType::ShowDialog,
        ActionType::ShowBottomSheet,
        ActionType::CallRestApi,
        ActionType::OpenUrl,
        ActionType::SetAppState,
        ActionType::ControlObject,
        ActionType::Share,
        ActionType::Delay,
        ActionType::CopyToClipboard,
        ActionType::PostMessage,
        ActionType::FireEvent,
        ActionType::Noop,
    ];

    /// Tag name without the `Action.` prefix
    pub fn name(&self) -> &str {
        match self {
            ActionType::ShowToast => "showToast",
            ActionType::SetState => "setState",
            ActionType::RebuildState => "rebuildState",
            ActionType::NavigateToPage => "navigateToPage",
            ActionType::NavigateBack => "navigateBack",
            ActionType::ShowDialog => "showDialog",
            ActionType::ShowBottomSheet => "showBottomSheet",
            ActionType::CallRestApi => "callRestApi",
            ActionType::OpenUrl => "openUrl",
            ActionType::SetAppState => "setAppState",
            ActionType::ControlObject => "controlObject",
            ActionType::Share => "share",
            ActionType::Delay => "delay",
            ActionType::CopyToClipboard => "copyToClipBoard",
            ActionType::PostMessage => "postMessage",
            ActionType::FireEvent => "fireEvent",
            ActionType::Noop => "noop",
            ActionType::Custom(name) => name,
        }
    }

    /// Tag as written in documents
    pub fn tag(&self) -> String {
        format!("{TAG_PREFIX}{}", self.name())
    }

    /// Classify a document tag
    ///
    /// Unknown tags become [`ActionType::Custom`]; whether they run is up to
    /// the registry and the unknown action policy.
    pub fn from_tag(tag: &str) -> Self {
        let name = strip_prefix(tag).to_ascii_lowercase();
        match name.as_str() {
            "showtoast" => ActionType::ShowToast,
            "setstate" => ActionType::SetState,
            "rebuildstate" => ActionType::RebuildState,
            "navigatetopage" => ActionType::NavigateToPage,
            "navigateback" => ActionType::NavigateBack,
            "showdialog" => ActionType::ShowDialog,
            "showbottomsheet" => ActionType::ShowBottomSheet,
            "callrestapi" => ActionType::CallRestApi,
            "openurl" => ActionType::OpenUrl,
            "setappstate" => ActionType::SetAppState,
            "controlobject" => ActionType::ControlObject,
            "share" => ActionType::Share,
            "delay" => ActionType::Delay,
            "copytoclipboard" => ActionType::CopyToClipboard,
            "postmessage" => ActionType::PostMessage,
            "fireevent" => ActionType::FireEvent,
            "noop" => ActionType::Noop,
            _ => ActionType::Custom(name),
        }
    }

    /// Type for a host-defined tag
    pub fn custom(tag: &str) -> Self {
        ActionType::Custom(strip_prefix(tag).to_ascii_lowercase())
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, ActionType::Custom(_))
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn strip_prefix(tag: &str) -> &str {
    match tag.get(..TAG_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(TAG_PREFIX) => &tag[TAG_PREFIX.len()..],
        _ => tag,
    }
}

/// Variant-specific fields of an action
#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    ShowToast(ShowToast),
    SetState(SetState),
    RebuildState(RebuildState),
    NavigateToPage(NavigateToPage),
    NavigateBack(NavigateBack),
    ShowDialog(ShowModal),
    ShowBottomSheet(ShowModal),
    CallRestApi(CallRestApi),
    OpenUrl(OpenUrl),
    SetAppState(SetAppState),
    ControlObject(ControlObject),
    Share(Share),
    Delay(Delay),
    CopyToClipboard(CopyToClipboard),
    PostMessage(PostMessage),
    FireEvent(FireEvent),
    /// No-op; `original_tag` is set when an unknown tag was downgraded
    Noop { original_tag: Option<String> },
    /// Host-defined action with its raw fields
    Custom { tag: String, fields: Map<String, Value> },
}

impl ActionKind {
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionKind::ShowToast(_) => ActionType::ShowToast,
            ActionKind::SetState(_) => ActionType::SetState,
            ActionKind::RebuildState(_) => ActionType::RebuildState,
            ActionKind::NavigateToPage(_) => ActionType::NavigateToPage,
            ActionKind::NavigateBack(_) => ActionType::NavigateBack,
            ActionKind::ShowDialog(_) => ActionType::ShowDialog,
            ActionKind::ShowBottomSheet(_) => ActionType::ShowBottomSheet,
            ActionKind::CallRestApi(_) => ActionType::CallRestApi,
            ActionKind::OpenUrl(_) => ActionType::OpenUrl,
            ActionKind::SetAppState(_) => ActionType::SetAppState,
            ActionKind::ControlObject(_) => ActionType::ControlObject,
            ActionKind::Share(_) => ActionType::Share,
            ActionKind::Delay(_) => ActionType::Delay,
            ActionKind::CopyToClipboard(_) => ActionType::CopyToClipboard,
            ActionKind::PostMessage(_) => ActionType::PostMessage,
            ActionKind::FireEvent(_) => ActionType::FireEvent,
            ActionKind::Noop { .. } => ActionType::Noop,
            ActionKind::Custom { tag, .. } => ActionType::custom(tag),
        }
    }

    /// Flows nested inside this action (dialog results, request callbacks)
    pub fn nested_flows_mut(&mut self) -> Vec<&mut Option<ActionFlow>> {
        match self {
            ActionKind::ShowDialog(modal) | ActionKind::ShowBottomSheet(modal) => {
                vec![&mut modal.on_result]
            }
            ActionKind::CallRestApi(call) => vec![&mut call.on_success, &mut call.on_error],
            _ => Vec::new(),
        }
    }

    fn parse(action_type: &ActionType, tag: &str, descriptor: &Map<String, Value>) -> Result<Self> {
        let value = Value::Object(descriptor.clone());
        Ok(match action_type {
            ActionType::ShowToast => ActionKind::ShowToast(fields(tag, &value)?),
            ActionType::SetState => ActionKind::SetState(fields(tag, &value)?),
            ActionType::RebuildState => ActionKind::RebuildState(fields(tag, &value)?),
            ActionType::NavigateToPage => ActionKind::NavigateToPage(fields(tag, &value)?),
            ActionType::NavigateBack => ActionKind::NavigateBack(fields(tag, &value)?),
            ActionType::ShowDialog => ActionKind::ShowDialog(fields(tag, &value)?),
            ActionType::ShowBottomSheet => ActionKind::ShowBottomSheet(fields(tag, &value)?),
            ActionType::CallRestApi => ActionKind::CallRestApi(fields(tag, &value)?),
            ActionType::OpenUrl => ActionKind::OpenUrl(fields(tag, &value)?),
            ActionType::SetAppState => ActionKind::SetAppState(fields(tag, &value)?),
            ActionType::ControlObject => ActionKind::ControlObject(fields(tag, &value)?),
            ActionType::Share => ActionKind::Share(fields(tag, &value)?),
            ActionType::Delay => ActionKind::Delay(fields(tag, &value)?),
            ActionType::CopyToClipboard => ActionKind::CopyToClipboard(fields(tag, &value)?),
            ActionType::PostMessage => ActionKind::PostMessage(fields(tag, &value)?),
            ActionType::FireEvent => ActionKind::FireEvent(fields(tag, &value)?),
            ActionType::Noop => ActionKind::Noop { original_tag: None },
            ActionType::Custom(_) => {
                let mut fields = descriptor.clone();
                fields.remove(TYPE_KEY);
                fields.remove(DISABLE_KEY);
                ActionKind::Custom {
                    tag: tag.to_string(),
                    fields,
                }
            }
        })
    }

    fn fields_to_json(&self) -> Result<Value> {
        Ok(match self {
            ActionKind::ShowToast(a) => serde_json::to_value(a)?,
            ActionKind::SetState(a) => serde_json::to_value(a)?,
            ActionKind::RebuildState(a) => serde_json::to_value(a)?,
            ActionKind::NavigateToPage(a) => serde_json::to_value(a)?,
            ActionKind::NavigateBack(a) => serde_json::to_value(a)?,
            ActionKind::ShowDialog(a) | ActionKind::ShowBottomSheet(a) => serde_json::to_value(a)?,
            ActionKind::CallRestApi(a) => serde_json::to_value(a)?,
            ActionKind::OpenUrl(a) => serde_json::to_value(a)?,
            ActionKind::SetAppState(a) => serde_json::to_value(a)?,
            ActionKind::ControlObject(a) => serde_json::to_value(a)?,
            ActionKind::Share(a) => serde_json::to_value(a)?,
            ActionKind::Delay(a) => serde_json::to_value(a)?,
            ActionKind::CopyToClipboard(a) => serde_json::to_value(a)?,
            ActionKind::PostMessage(a) => serde_json::to_value(a)?,
            ActionKind::FireEvent(a) => serde_json::to_value(a)?,
            ActionKind::Noop { .. } => Value::Object(Map::new()),
            ActionKind::Custom { fields, .. } => Value::Object(fields.clone()),
        })
    }
}

fn fields<T: DeserializeOwned>(tag: &str, value: &Value) -> Result<T> {
    T::deserialize(value).map_err(|e| ActionError::InvalidDescriptor(format!("{tag}: {e}")))
}

/// One step of a flow
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub kind: ActionKind,

    /// Skip the step when this evaluates to true
    pub disable_action_if: Option<ExprOr<bool>>,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            disable_action_if: None,
        }
    }

    /// Attach a disable condition
    pub fn with_disable_if(mut self, condition: ExprOr<bool>) -> Self {
        self.disable_action_if = Some(condition);
        self
    }

    pub fn action_type(&self) -> ActionType {
        self.kind.action_type()
    }

    /// Evaluate the disable condition; absent or failed conditions enable
    pub fn is_disabled(&self, scope: &ScopeContext) -> bool {
        self.disable_action_if
            .as_ref()
            .and_then(|condition| condition.evaluate(Some(scope)))
            .unwrap_or(false)
    }

    /// Parse one action descriptor
    pub fn from_json(value: &Value) -> Result<Self> {
        let descriptor = value.as_object().ok_or_else(|| {
            ActionError::InvalidDescriptor(format!("expected an object, got {value}"))
        })?;
        let tag = descriptor
            .get(TYPE_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| ActionError::InvalidDescriptor("missing 'type' tag".to_string()))?;

        let disable_action_if = match descriptor.get(DISABLE_KEY) {
            None | Some(Value::Null) => None,
            Some(raw) => Some(ExprOr::<bool>::from_document(raw)),
        };

        let action_type = ActionType::from_tag(tag);
        let kind = ActionKind::parse(&action_type, tag, descriptor)?;
        Ok(Self {
            kind,
            disable_action_if,
        })
    }

    /// Serialize back to a descriptor
    ///
    /// A downgraded unknown step keeps its original tag.
    pub fn to_json(&self) -> Result<Value> {
        let mut descriptor = match self.kind.fields_to_json()? {
            Value::Object(map) => map,
            other => {
                return Err(ActionError::InvalidDescriptor(format!(
                    "fields of {} serialized to {other}",
                    self.action_type()
                )))
            }
        };
        let tag = match &self.kind {
            ActionKind::Noop {
                original_tag: Some(tag),
            }
            | ActionKind::Custom { tag, .. } => tag.clone(),
            kind => kind.action_type().tag(),
        };
        descriptor.insert(TYPE_KEY.to_string(), Value::String(tag));
        if let Some(condition) = &self.disable_action_if {
            descriptor.insert(DISABLE_KEY.to_string(), condition.to_value());
        }
        Ok(Value::Object(descriptor))
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Action::from_json(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tag_matching() {
        assert_eq!(ActionType::from_tag("Action.showToast"), ActionType::ShowToast);
        assert_eq!(ActionType::from_tag("showtoast"), ActionType::ShowToast);
        assert_eq!(ActionType::from_tag("ACTION.SETSTATE"), ActionType::SetState);
        assert_eq!(
            ActionType::from_tag("Action.copyToClipboard"),
            ActionType::CopyToClipboard
        );
        assert_eq!(
            ActionType::from_tag("Action.Vibrate"),
            ActionType::Custom("vibrate".to_string())
        );
        assert_eq!(ActionType::custom("Action.Vibrate"), ActionType::from_tag("vibrate"));
    }

    #[test]
    fn test_tags_round_trip() {
        for action_type in ActionType::BUILTIN {
            assert_eq!(&ActionType::from_tag(&action_type.tag()), action_type);
        }
        assert_eq!(ActionType::ShowToast.tag(), "Action.showToast");
    }

    #[test]
    fn test_parse_show_toast() {
        let action = Action::from_json(&json!({
            "type": "Action.showToast",
            "message": "@{name}",
            "duration": "long",
            "disableActionIf": "@{count > 3}",
        }))
        .unwrap();

        assert_eq!(action.action_type(), ActionType::ShowToast);
        assert_eq!(
            action.disable_action_if,
            Some(ExprOr::expression("count > 3"))
        );
        let ActionKind::ShowToast(toast) = &action.kind else {
            panic!("expected a toast");
        };
        assert_eq!(toast.message, ExprOr::expression("name"));
    }

    #[test]
    fn test_disable_condition() {
        let scope = ScopeContext::new("test").with_var("count", json!(5));
        let toast = |condition: Value| {
            Action::from_json(&json!({
                "type": "showToast",
                "message": "hi",
                "disableActionIf": condition,
            }))
            .unwrap()
        };

        assert!(toast(json!("@{count > 3}")).is_disabled(&scope));
        assert!(!toast(json!("@{count > 9}")).is_disabled(&scope));
        assert!(toast(json!(true)).is_disabled(&scope));
        // failed evaluation enables the step
        assert!(!toast(json!("@{missing.field}")).is_disabled(&scope));
    }

    #[test]
    fn test_malformed_descriptors() {
        assert!(Action::from_json(&json!("showToast")).is_err());
        assert!(Action::from_json(&json!({"message": "hi"})).is_err());
        assert!(Action::from_json(&json!({"type": "showToast"})).is_err());
    }

    #[test]
    fn test_unusable_literals_fall_back() {
        let scope = ScopeContext::new("page");
        let action = Action::from_json(&json!({
            "type": "showToast",
            "message": "hi",
            "duration": "forever",
            "disableActionIf": [1, 2],
        }))
        .unwrap();
        assert_eq!(action.disable_action_if, Some(ExprOr::Unresolved(json!([1, 2]))));
        assert!(!action.is_disabled(&scope));

        let action = Action::from_json(&json!({
            "type": "delay",
            "durationInMs": "soon",
            "disableActionIf": "yes",
        }))
        .unwrap();
        assert!(!action.is_disabled(&scope));
        assert_eq!(action.action_type(), ActionType::Delay);
    }

    #[test]
    fn test_unknown_tag_parses_as_custom() {
        let action = Action::from_json(&json!({
            "type": "Action.vibrate",
            "pattern": [100, 50],
            "disableActionIf": false,
        }))
        .unwrap();

        match &action.kind {
            ActionKind::Custom { tag, fields } => {
                assert_eq!(tag, "Action.vibrate");
                assert_eq!(fields.get("pattern"), Some(&json!([100, 50])));
                assert!(!fields.contains_key("type"));
            }
            other => panic!("expected a custom action, got {other:?}"),
        }
        assert_eq!(action.action_type(), ActionType::custom("vibrate"));
    }

    #[test]
    fn test_to_json_round_trip() {
        let descriptor = json!({
            "type": "Action.setState",
            "stateContextName": "page",
            "updates": [{"stateName": "x", "newValue": "@{1 + 1}"}],
            "rebuild": false,
            "disableActionIf": "@{busy}",
        });
        let action = Action::from_json(&descriptor).unwrap();
        let written = action.to_json().unwrap();

        assert_eq!(written["type"], json!("Action.setState"));
        assert_eq!(written["disableActionIf"], json!("@{busy}"));
        assert_eq!(written["updates"][0]["newValue"], json!("@{1 + 1}"));
        assert_eq!(Action::from_json(&written).unwrap(), action);
    }

    #[test]
    fn test_downgraded_step_keeps_tag() {
        let action = Action::new(ActionKind::Noop {
            original_tag: Some("Action.vibrate".to_string()),
        });
        assert_eq!(action.to_json().unwrap(), json!({"type": "Action.vibrate"}));
    }
}
