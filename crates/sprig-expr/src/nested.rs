//! Evaluation of expressions embedded anywhere in a JSON document

use crate::eval::stringify;
use crate::expr_or::{is_expression, unescape, ExprOr};
use crate::scope::ScopeContext;
use serde_json::{Map, Value};

/// Evaluate every expression leaf in `value`
///
/// Maps and lists are walked recursively. String leaves containing `@{...}`
/// are replaced by their result (null when evaluation fails). Map keys are
/// evaluated too and rendered as text. Other strings have `@@{` unescaped,
/// and all remaining values pass through.
pub fn evaluate_nested_expressions(value: &Value, scope: Option<&ScopeContext>) -> Value {
    match value {
        Value::String(text) if is_expression(text) => evaluate_leaf(value, scope),
        Value::String(text) => Value::String(unescape(text).into_owned()),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| evaluate_nested_expressions(item, scope))
                .collect(),
        ),
        Value::Object(map) => {
            let mut evaluated = Map::with_capacity(map.len());
            for (key, item) in map {
                let key = if is_expression(key) {
                    stringify(&evaluate_leaf(&Value::String(key.clone()), scope))
                } else {
                    unescape(key).into_owned()
                };
                evaluated.insert(key, evaluate_nested_expressions(item, scope));
            }
            Value::Object(evaluated)
        }
        other => other.clone(),
    }
}

fn evaluate_leaf(leaf: &Value, scope: Option<&ScopeContext>) -> Value {
    ExprOr::<Value>::from_value(leaf)
        .and_then(|expr| expr.evaluate(scope))
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_document() {
        let scope = ScopeContext::new("page")
            .with_var("id", json!(7))
            .with_var("field", json!("status"));

        let template = json!({
            "userId": "@{id}",
            "meta": {
                "@{field}": "active",
                "tags": ["fixed", "@{id * 2}", {"deep": "#@{id}"}],
            },
            "count": 3,
            "flag": true,
            "empty": null,
        });

        let evaluated = evaluate_nested_expressions(&template, Some(&scope));

        assert_eq!(
            evaluated,
            json!({
                "userId": 7,
                "meta": {
                    "status": "active",
                    "tags": ["fixed", 14, {"deep": "#7"}],
                },
                "count": 3,
                "flag": true,
                "empty": null,
            })
        );
    }

    #[test]
    fn test_failed_leaf_becomes_null() {
        let evaluated = evaluate_nested_expressions(&json!({"a": "@{missing}"}), None);
        assert_eq!(evaluated, json!({"a": null}));
    }

    #[test]
    fn test_plain_values_pass_through() {
        let value = json!([1, "two", {"three": 3.0}]);
        assert_eq!(evaluate_nested_expressions(&value, None), value);
    }

    #[test]
    fn test_escaped_leaves_are_unescaped() {
        let value = json!({"@@{key}": "literal @@{text}"});
        assert_eq!(
            evaluate_nested_expressions(&value, None),
            json!({"@{key}": "literal @{text}"})
        );
    }
}
