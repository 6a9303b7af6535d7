//! Literal-or-expression values
//!
//! In a document, a field holding `"@{count + 1}"` is an expression; any other
//! value is a literal. A string mixing text with `@{...}` blocks, such as
//! `"Hello @{name}!"`, is an interpolated template and is stored as the
//! equivalent `concat(...)` expression.
//!
//! A literal `@{` is written `@@{` in a document.

use crate::coerce::FromDynamic;
use crate::eval;
use crate::scope::ScopeContext;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::borrow::Cow;

/// Opening delimiter of an embedded expression
pub const EXPR_OPEN: &str = "@{";

/// Escaped form of [`EXPR_OPEN`] inside literal text
pub const EXPR_OPEN_ESCAPED: &str = "@@{";

/// A literal value or expression text evaluated on demand
#[derive(Debug, Clone, PartialEq)]
pub enum ExprOr<T> {
    Literal(T),
    /// Expression source, without the `@{ }` delimiter
    Expression(String),
    /// A document literal whose shape does not fit `T`
    ///
    /// Evaluates to `None` so callers fall back to their default, and
    /// serializes back unchanged.
    Unresolved(Value),
}

impl<T> ExprOr<T> {
    /// Wrap expression source
    pub fn expression(source: impl Into<String>) -> Self {
        ExprOr::Expression(source.into())
    }

    /// Check whether this holds an expression
    pub fn is_expression(&self) -> bool {
        matches!(self, ExprOr::Expression(_))
    }
}

impl<T: FromDynamic> ExprOr<T> {
    /// Read a document value; `None` when a literal has an incompatible shape
    pub fn from_value(value: &Value) -> Option<Self> {
        if let Value::String(text) = value {
            if let Some(source) = expression_source(text) {
                return Some(ExprOr::Expression(source));
            }
            if text.contains(EXPR_OPEN_ESCAPED) {
                return T::from_dynamic(&Value::String(unescape(text).into_owned()))
                    .map(ExprOr::Literal);
            }
        }
        T::from_dynamic(value).map(ExprOr::Literal)
    }

    /// Read a document value, keeping incompatible literals as
    /// [`ExprOr::Unresolved`]
    pub fn from_document(value: &Value) -> Self {
        Self::from_value(value).unwrap_or_else(|| ExprOr::Unresolved(value.clone()))
    }
}

impl<T: FromDynamic + Clone> ExprOr<T> {
    /// Evaluate against `scope` (an empty scope when `None`)
    ///
    /// Returns `None` when the expression fails, the result cannot be
    /// coerced to `T`, or the literal is unresolved.
    pub fn evaluate(&self, scope: Option<&ScopeContext>) -> Option<T> {
        match self {
            ExprOr::Literal(value) => Some(value.clone()),
            ExprOr::Expression(source) => {
                eval::evaluate(source, scope).and_then(|v| T::from_dynamic(&v))
            }
            ExprOr::Unresolved(_) => None,
        }
    }

    /// Evaluate, falling back to `default`
    pub fn evaluate_or(&self, scope: Option<&ScopeContext>, default: T) -> T {
        self.evaluate(scope).unwrap_or(default)
    }
}

impl<T: Serialize> ExprOr<T> {
    /// Document form: the raw literal, or `@{source}`
    ///
    /// A string literal containing `@{` is written with `@@{` so it reads
    /// back as the same literal. Strings nested inside list or map literals
    /// are written as is.
    pub fn to_value(&self) -> Value {
        match self {
            ExprOr::Literal(value) => match serde_json::to_value(value) {
                Ok(Value::String(text)) if text.contains(EXPR_OPEN) => {
                    Value::String(text.replace(EXPR_OPEN, EXPR_OPEN_ESCAPED))
                }
                Ok(value) => value,
                Err(_) => Value::Null,
            },
            ExprOr::Expression(source) => Value::String(format!("{EXPR_OPEN}{source}}}")),
            ExprOr::Unresolved(raw) => raw.clone(),
        }
    }
}

impl<T> From<T> for ExprOr<T> {
    fn from(value: T) -> Self {
        ExprOr::Literal(value)
    }
}

impl<T: Serialize> Serialize for ExprOr<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de, T: FromDynamic> Deserialize<'de> for ExprOr<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(ExprOr::from_document(&value))
    }
}

/// Evaluate a raw document value as `T`
///
/// Expression strings are evaluated against `scope`; anything else is
/// coerced directly.
pub fn evaluate_as<T: FromDynamic>(raw: &Value, scope: Option<&ScopeContext>) -> Option<T> {
    if let Value::String(text) = raw {
        if let Some(source) = expression_source(text) {
            return eval::evaluate(&source, scope).and_then(|v| T::from_dynamic(&v));
        }
        if text.contains(EXPR_OPEN_ESCAPED) {
            return T::from_dynamic(&Value::String(unescape(text).into_owned()));
        }
    }
    T::from_dynamic(raw)
}

/// Check whether a string contains an `@{...}` block
pub fn is_expression(text: &str) -> bool {
    find_blocks(text).is_some_and(|blocks| !blocks.is_empty())
}

/// Replace each `@@{` with a literal `@{`
pub fn unescape(text: &str) -> Cow<'_, str> {
    if text.contains(EXPR_OPEN_ESCAPED) {
        Cow::Owned(text.replace(EXPR_OPEN_ESCAPED, EXPR_OPEN))
    } else {
        Cow::Borrowed(text)
    }
}

/// Byte ranges of each `@{...}` block, outer delimiters included
///
/// Braces inside the block nest, and quoted strings are skipped so that
/// `@{ {a: '}'} }` is one block. An `@{` preceded by `@` is escaped text.
/// `None` when a block is left open.
fn find_blocks(text: &str) -> Option<Vec<(usize, usize)>> {
    let bytes = text.as_bytes();
    let mut blocks = Vec::new();
    let mut i = 0;

    while let Some(offset) = text[i..].find(EXPR_OPEN) {
        let start = i + offset;
        if start > 0 && bytes[start - 1] == b'@' {
            i = start + EXPR_OPEN.len();
            continue;
        }
        let mut depth = 1;
        let mut j = start + EXPR_OPEN.len();
        let mut quote: Option<u8> = None;

        while j < bytes.len() && depth > 0 {
            let b = bytes[j];
            match quote {
                Some(_) if b == b'\\' => j += 1,
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None => match b {
                    b'\'' | b'"' => quote = Some(b),
                    b'{' => depth += 1,
                    b'}' => depth -= 1,
                    _ => {}
                },
            }
            j += 1;
        }

        if depth > 0 {
            return None;
        }
        blocks.push((start, j));
        i = j;
    }

    Some(blocks)
}

/// Expression source for a document string, if it is one
fn expression_source(text: &str) -> Option<String> {
    let blocks = find_blocks(text)?;
    match blocks.as_slice() {
        [] => None,
        [(0, end)] if *end == text.len() => {
            Some(text[EXPR_OPEN.len()..text.len() - 1].to_string())
        }
        _ => {
            let mut parts = Vec::new();
            let mut cursor = 0;
            for &(start, end) in &blocks {
                if start > cursor {
                    parts.push(quote_literal(&unescape(&text[cursor..start])));
                }
                parts.push(format!("({})", &text[start + EXPR_OPEN.len()..end - 1]));
                cursor = end;
            }
            if cursor < text.len() {
                parts.push(quote_literal(&unescape(&text[cursor..])));
            }
            Some(format!("concat({})", parts.join(", ")))
        }
    }
}

fn quote_literal(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literal_round_trip() {
        let literal: ExprOr<i64> = ExprOr::Literal(42);
        let value = literal.to_value();
        assert_eq!(value, json!(42));
        assert_eq!(ExprOr::<i64>::from_value(&value), Some(literal));

        let literal: ExprOr<String> = ExprOr::Literal("plain text".to_string());
        assert_eq!(
            ExprOr::<String>::from_value(&literal.to_value()),
            Some(literal)
        );
    }

    #[test]
    fn test_expression_round_trip() {
        let expr: ExprOr<bool> = ExprOr::expression("count > 1");
        let value = expr.to_value();
        assert_eq!(value, json!("@{count > 1}"));
        assert_eq!(ExprOr::<bool>::from_value(&value), Some(expr));
    }

    #[test]
    fn test_nested_braces_stay_in_one_block() {
        let expr = ExprOr::<Value>::from_value(&json!("@{ {a: '}'} }")).unwrap();
        assert_eq!(expr, ExprOr::expression(" {a: '}'} "));
        assert_eq!(expr.evaluate(None), Some(json!({"a": "}"})));
    }

    #[test]
    fn test_interpolated_template() {
        let scope = ScopeContext::new("page").with_var("name", json!("Ada"));
        let expr = ExprOr::<String>::from_value(&json!("Hi @{name}, it's @{1 + 1}!")).unwrap();

        assert!(expr.is_expression());
        assert_eq!(expr.evaluate(Some(&scope)), Some("Hi Ada, it's 2!".to_string()));
    }

    #[test]
    fn test_unterminated_block_is_literal() {
        let expr = ExprOr::<String>::from_value(&json!("@{oops")).unwrap();
        assert_eq!(expr, ExprOr::Literal("@{oops".to_string()));
    }

    #[test]
    fn test_incompatible_literal_is_unresolved() {
        assert_eq!(ExprOr::<i64>::from_value(&json!({"a": 1})), None);

        let parsed: ExprOr<bool> = serde_json::from_value(json!([1])).unwrap();
        assert_eq!(parsed, ExprOr::Unresolved(json!([1])));
        assert_eq!(parsed.evaluate(None), None);
        assert!(!parsed.evaluate_or(None, false));
        assert_eq!(serde_json::to_value(&parsed).unwrap(), json!([1]));

        let parsed: ExprOr<i64> = serde_json::from_value(json!("soon")).unwrap();
        assert_eq!(parsed.evaluate_or(None, 0), 0);
        assert!(!parsed.is_expression());
    }

    #[test]
    fn test_escaped_delimiter_stays_literal() {
        let literal: ExprOr<String> = ExprOr::Literal("price: @{amount}".to_string());
        let value = literal.to_value();
        assert_eq!(value, json!("price: @@{amount}"));
        assert!(!is_expression("price: @@{amount}"));
        assert_eq!(ExprOr::<String>::from_value(&value), Some(literal));

        let literal: ExprOr<String> = ExprOr::Literal("@@{".to_string());
        assert_eq!(ExprOr::<String>::from_value(&literal.to_value()), Some(literal));
    }

    #[test]
    fn test_escaped_delimiter_in_template() {
        let scope = ScopeContext::new("page").with_var("n", json!(3));
        let expr = ExprOr::<String>::from_value(&json!("@@{n} is @{n}")).unwrap();
        assert_eq!(expr.evaluate(Some(&scope)), Some("@{n} is 3".to_string()));
        assert_eq!(
            evaluate_as::<String>(&json!("keep @@{this}"), Some(&scope)),
            Some("keep @{this}".to_string())
        );
    }

    #[test]
    fn test_evaluate_coerces_and_defaults() {
        let scope = ScopeContext::new("page").with_var("n", json!("7"));

        let expr: ExprOr<i64> = ExprOr::expression("n");
        assert_eq!(expr.evaluate(Some(&scope)), Some(7));

        let broken: ExprOr<bool> = ExprOr::expression("missing == 1 +");
        assert_eq!(broken.evaluate(Some(&scope)), None);
        assert!(!broken.evaluate_or(Some(&scope), false));
    }

    #[test]
    fn test_evaluate_as_raw_values() {
        let scope = ScopeContext::new("page").with_var("x", json!(2));
        assert_eq!(evaluate_as::<i64>(&json!("@{x * 3}"), Some(&scope)), Some(6));
        assert_eq!(evaluate_as::<i64>(&json!(5), Some(&scope)), Some(5));
        assert_eq!(evaluate_as::<bool>(&json!("nope"), Some(&scope)), None);
    }

    #[test]
    fn test_serde_integration() {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct Field {
            value: ExprOr<f64>,
        }

        let parsed: Field = serde_json::from_value(json!({"value": "@{a}"})).unwrap();
        assert_eq!(parsed.value, ExprOr::expression("a"));
        assert_eq!(serde_json::to_value(&parsed).unwrap(), json!({"value": "@{a}"}));
    }

    #[test]
    fn test_is_expression() {
        assert!(is_expression("@{a}"));
        assert!(is_expression("x @{a} y"));
        assert!(!is_expression("plain"));
        assert!(!is_expression("@{never closed"));
    }
}
