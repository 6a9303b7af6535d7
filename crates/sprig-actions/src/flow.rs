//! Action flows
//!
//! A flow document is `{"steps": [...], "inkWell": bool}`; a bare array of
//! steps is accepted too. Steps that fail to parse are dropped with a
//! warning, and a flow with no steps left is no flow at all.

use crate::action::{Action, ActionKind, ActionType};
use crate::config::UnknownActionPolicy;
use crate::error::{ActionError, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, warn};

const STEPS_KEY: &str = "steps";
const INK_WELL_KEY: &str = "inkWell";

/// An ordered list of actions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionFlow {
    pub actions: Vec<Action>,

    /// Display hint for the triggering widget; no effect on execution
    pub ink_well: bool,
}

impl ActionFlow {
    pub fn new(actions: Vec<Action>) -> Self {
        Self {
            actions,
            ink_well: false,
        }
    }

    pub fn with_ink_well(mut self, ink_well: bool) -> Self {
        self.ink_well = ink_well;
        self
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    /// Parse a flow document
    ///
    /// Unknown tags are kept as custom steps; see [`ActionFlow::normalize`].
    pub fn from_json(value: &Value) -> Option<Self> {
        let (steps, ink_well) = match value {
            Value::Array(steps) => (steps.as_slice(), false),
            Value::Object(map) => match map.get(STEPS_KEY) {
                Some(Value::Array(steps)) => (
                    steps.as_slice(),
                    map.get(INK_WELL_KEY)
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                ),
                _ => {
                    warn!("Flow document has no steps array");
                    return None;
                }
            },
            Value::Null => return None,
            other => {
                warn!(document = %other, "Flow document is neither an object nor an array");
                return None;
            }
        };

        let actions: Vec<Action> = steps
            .iter()
            .enumerate()
            .filter_map(|(index, step)| match Action::from_json(step) {
                Ok(action) => Some(action),
                Err(e) => {
                    warn!(index, error = %e, "Dropping malformed action step");
                    None
                }
            })
            .collect();

        if actions.is_empty() {
            return None;
        }
        Some(Self { actions, ink_well })
    }

    /// Parse a flow document and apply the unknown action policy
    pub fn from_json_with(value: &Value, options: &ParseOptions) -> Option<Self> {
        Self::from_json(value).and_then(|flow| flow.normalize(options))
    }

    /// Apply the unknown action policy, nested flows included
    ///
    /// Custom steps whose type is not in `options` are dropped or
    /// downgraded to no-ops. Returns `None` when nothing is left.
    pub fn normalize(mut self, options: &ParseOptions) -> Option<Self> {
        let mut kept = Vec::with_capacity(self.actions.len());
        for mut action in self.actions {
            for nested in action.kind.nested_flows_mut() {
                *nested = nested.take().and_then(|flow| flow.normalize(options));
            }

            let unknown_tag = match &action.kind {
                ActionKind::Custom { tag, .. } if !options.is_known(&ActionType::custom(tag)) => {
                    Some(tag.clone())
                }
                _ => None,
            };
            if let Some(tag) = unknown_tag {
                match options.unknown_actions {
                    UnknownActionPolicy::Drop => {
                        warn!(tag = %tag, "Dropping action with unknown type");
                        continue;
                    }
                    UnknownActionPolicy::Fallback => {
                        debug!(tag = %tag, "Unknown action type runs as a no-op");
                        action.kind = ActionKind::Noop {
                            original_tag: Some(tag),
                        };
                    }
                }
            }
            kept.push(action);
        }

        self.actions = kept;
        if self.actions.is_empty() {
            None
        } else {
            Some(self)
        }
    }

    /// Serialize back to a flow document
    pub fn to_json(&self) -> Result<Value> {
        let steps = self
            .actions
            .iter()
            .map(Action::to_json)
            .collect::<Result<Vec<_>>>()?;
        let mut document = Map::new();
        document.insert(STEPS_KEY.to_string(), Value::Array(steps));
        document.insert(INK_WELL_KEY.to_string(), Value::Bool(self.ink_well));
        Ok(Value::Object(document))
    }
}

impl<'a> IntoIterator for &'a ActionFlow {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

impl Serialize for ActionFlow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ActionFlow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ActionFlow::from_json(&value).ok_or_else(|| {
            D::Error::custom(ActionError::InvalidDescriptor(
                "flow has no usable steps".to_string(),
            ))
        })
    }
}

/// Deserialize a nested flow field, collapsing empty flows to `None`
pub(crate) fn optional_flow<'de, D>(deserializer: D) -> std::result::Result<Option<ActionFlow>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(ActionFlow::from_json(&value))
}

/// Parser settings
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// What happens to steps with unknown tags
    pub unknown_actions: UnknownActionPolicy,

    /// Host-defined types that are not unknown
    pub custom_types: HashSet<ActionType>,
}

impl ParseOptions {
    pub fn new(unknown_actions: UnknownActionPolicy) -> Self {
        Self {
            unknown_actions,
            custom_types: HashSet::new(),
        }
    }

    pub fn with_custom_type(mut self, action_type: ActionType) -> Self {
        self.custom_types.insert(action_type);
        self
    }

    fn is_known(&self, action_type: &ActionType) -> bool {
        !action_type.is_custom() || self.custom_types.contains(action_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> Value {
        json!({
            "steps": [
                {"type": "Action.showToast", "message": "one"},
                {"type": "Action.showToast"},
                "not an action",
                {"type": "Action.vibrate", "pattern": [1]},
                {"type": "Action.delay", "durationInMs": 10},
            ],
            "inkWell": true,
        })
    }

    #[test]
    fn test_malformed_steps_are_dropped() {
        let flow = ActionFlow::from_json(&document()).unwrap();
        assert_eq!(flow.len(), 3);
        assert!(flow.ink_well);
        let types: Vec<_> = flow.iter().map(Action::action_type).collect();
        assert_eq!(
            types,
            vec![
                ActionType::ShowToast,
                ActionType::custom("vibrate"),
                ActionType::Delay
            ]
        );
    }

    #[test]
    fn test_empty_flow_collapses() {
        assert!(ActionFlow::from_json(&json!({"steps": []})).is_none());
        assert!(ActionFlow::from_json(&json!({"steps": [{"type": "showToast"}]})).is_none());
        assert!(ActionFlow::from_json(&json!({"inkWell": true})).is_none());
        assert!(ActionFlow::from_json(&Value::Null).is_none());
        assert!(ActionFlow::from_json(&json!(42)).is_none());
    }

    #[test]
    fn test_bare_array() {
        let flow = ActionFlow::from_json(&json!([{"type": "noop"}])).unwrap();
        assert_eq!(flow.len(), 1);
        assert!(!flow.ink_well);
    }

    #[test]
    fn test_fallback_policy() {
        let flow = ActionFlow::from_json_with(&document(), &ParseOptions::default()).unwrap();
        assert_eq!(flow.len(), 3);
        assert_eq!(
            flow.actions[1].kind,
            ActionKind::Noop {
                original_tag: Some("Action.vibrate".to_string())
            }
        );
    }

    #[test]
    fn test_drop_policy() {
        let options = ParseOptions::new(UnknownActionPolicy::Drop);
        let flow = ActionFlow::from_json_with(&document(), &options).unwrap();
        assert_eq!(flow.len(), 2);

        let only_unknown = json!({"steps": [{"type": "vibrate"}]});
        assert!(ActionFlow::from_json_with(&only_unknown, &options).is_none());
    }

    #[test]
    fn test_registered_custom_type_is_kept() {
        let options = ParseOptions::new(UnknownActionPolicy::Drop)
            .with_custom_type(ActionType::custom("vibrate"));
        let flow = ActionFlow::from_json_with(&document(), &options).unwrap();
        assert!(matches!(flow.actions[1].kind, ActionKind::Custom { .. }));
    }

    #[test]
    fn test_policy_reaches_nested_flows() {
        let document = json!({"steps": [{
            "type": "Action.callRestApi",
            "dataSource": {"url": "https://example.com"},
            "onSuccess": {"steps": [{"type": "vibrate"}, {"type": "noop"}]},
            "onError": {"steps": [{"type": "vibrate"}]},
        }]});

        let options = ParseOptions::new(UnknownActionPolicy::Drop);
        let flow = ActionFlow::from_json_with(&document, &options).unwrap();
        let ActionKind::CallRestApi(call) = &flow.actions[0].kind else {
            panic!("expected a rest call");
        };
        assert_eq!(call.on_success.as_ref().map(ActionFlow::len), Some(1));
        assert!(call.on_error.is_none());
    }

    #[test]
    fn test_to_json_round_trip() {
        let flow = ActionFlow::from_json(&document()).unwrap();
        let written = flow.to_json().unwrap();

        assert_eq!(written["inkWell"], json!(true));
        assert_eq!(written["steps"].as_array().map(Vec::len), Some(3));
        assert_eq!(ActionFlow::from_json(&written), Some(flow));
    }
}
