//! Expression evaluation
//!
//! Evaluation is side-effect free: it only reads from the [`ScopeContext`].
//! The public [`evaluate`] entry point never fails. Parse errors, missing
//! variables and type mismatches are logged and reported as `None` so the
//! caller can apply its own default.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::{ExprError, Result};
use crate::parser::parse;
use crate::scope::ScopeContext;
use serde_json::{Map, Value};
use tracing::debug;

/// Evaluate expression source, returning `None` on any failure
pub fn evaluate(source: &str, scope: Option<&ScopeContext>) -> Option<Value> {
    match try_evaluate(source, scope) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(expression = %source, error = %e, "Expression evaluated to null");
            None
        }
    }
}

/// Evaluate expression source, reporting why it failed
pub fn try_evaluate(source: &str, scope: Option<&ScopeContext>) -> Result<Value> {
    let expr = parse(source)?;
    let empty = ScopeContext::new("empty");
    eval_expr(&expr, scope.unwrap_or(&empty))
}

/// Evaluate a parsed expression against a scope
pub fn eval_expr(expr: &Expr, scope: &ScopeContext) -> Result<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Variable(name) => scope
            .get_value(name)
            .ok_or_else(|| ExprError::VariableNotFound(name.clone())),
        Expr::List(items) => items
            .iter()
            .map(|item| eval_expr(item, scope))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Expr::Map(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                let key = stringify(&eval_expr(key, scope)?);
                map.insert(key, eval_expr(value, scope)?);
            }
            Ok(Value::Object(map))
        }
        Expr::Member { object, name } => member(&eval_expr(object, scope)?, name),
        Expr::Index { object, index } => {
            index_value(&eval_expr(object, scope)?, &eval_expr(index, scope)?)
        }
        Expr::Call { name, args } => {
            let args = args
                .iter()
                .map(|arg| eval_expr(arg, scope))
                .collect::<Result<Vec<_>>>()?;
            call_builtin(name, &args)
        }
        Expr::Unary { op, operand } => {
            let value = eval_expr(operand, scope)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!is_truthy(&value))),
                UnaryOp::Neg => match Num::of(&value) {
                    Some(Num::Int(n)) => Ok(n
                        .checked_neg()
                        .map(Value::from)
                        .unwrap_or_else(|| Value::from(-(n as f64)))),
                    Some(Num::Float(f)) => Ok(Value::from(-f)),
                    None => Err(ExprError::Type(format!("cannot negate {value}"))),
                },
            }
        }
        Expr::Binary { left, op, right } => {
            // && and || short-circuit and return the deciding operand's truthiness
            match op {
                BinaryOp::And => {
                    let l = eval_expr(left, scope)?;
                    if !is_truthy(&l) {
                        return Ok(Value::Bool(false));
                    }
                    return Ok(Value::Bool(is_truthy(&eval_expr(right, scope)?)));
                }
                BinaryOp::Or => {
                    let l = eval_expr(left, scope)?;
                    if is_truthy(&l) {
                        return Ok(Value::Bool(true));
                    }
                    return Ok(Value::Bool(is_truthy(&eval_expr(right, scope)?)));
                }
                _ => {}
            }
            let l = eval_expr(left, scope)?;
            let r = eval_expr(right, scope)?;
            apply_binary(*op, &l, &r)
        }
        Expr::Conditional {
            condition,
            then,
            otherwise,
        } => {
            if is_truthy(&eval_expr(condition, scope)?) {
                eval_expr(then, scope)
            } else {
                eval_expr(otherwise, scope)
            }
        }
    }
}

/// Truthiness used by `!`, `&&`, `||` and `?:`
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Render a value as display text (strings unquoted, collections as JSON)
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(value: &Value) -> Option<Num> {
        let Value::Number(n) = value else {
            return None;
        };
        n.as_i64()
            .map(Num::Int)
            .or_else(|| n.as_f64().map(Num::Float))
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(f) => f,
        }
    }
}

fn int_op(
    a: Num,
    b: Num,
    checked: fn(i64, i64) -> Option<i64>,
    float: fn(f64, f64) -> f64,
) -> Value {
    if let (Num::Int(x), Num::Int(y)) = (a, b) {
        if let Some(n) = checked(x, y) {
            return Value::from(n);
        }
    }
    Value::from(float(a.as_f64(), b.as_f64()))
}

fn apply_binary(op: BinaryOp, l: &Value, r: &Value) -> Result<Value> {
    match op {
        BinaryOp::Eq => return Ok(Value::Bool(loose_eq(l, r))),
        BinaryOp::NotEq => return Ok(Value::Bool(!loose_eq(l, r))),
        BinaryOp::Add => {
            match (l, r) {
                (Value::String(_), _) | (_, Value::String(_)) => {
                    return Ok(Value::String(format!("{}{}", stringify(l), stringify(r))));
                }
                (Value::Array(a), Value::Array(b)) => {
                    return Ok(Value::Array(a.iter().chain(b).cloned().collect()));
                }
                _ => {}
            }
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (l, r) {
                (Value::String(a), Value::String(b)) => a.partial_cmp(b),
                _ => match (Num::of(l), Num::of(r)) {
                    (Some(a), Some(b)) => a.as_f64().partial_cmp(&b.as_f64()),
                    _ => None,
                },
            }
            .ok_or_else(|| ExprError::Type(format!("cannot compare {l} and {r}")))?;
            let result = match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            return Ok(Value::Bool(result));
        }
        _ => {}
    }

    let (Some(a), Some(b)) = (Num::of(l), Num::of(r)) else {
        return Err(ExprError::Type(format!(
            "operator {op:?} needs numbers, got {l} and {r}"
        )));
    };

    match op {
        BinaryOp::Add => Ok(int_op(a, b, i64::checked_add, |x, y| x + y)),
        BinaryOp::Sub => Ok(int_op(a, b, i64::checked_sub, |x, y| x - y)),
        BinaryOp::Mul => Ok(int_op(a, b, i64::checked_mul, |x, y| x * y)),
        BinaryOp::Div => {
            if b.as_f64() == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            match (a, b) {
                (Num::Int(x), Num::Int(y)) if x.checked_rem(y) == Some(0) => {
                    Ok(Value::from(x / y))
                }
                _ => Ok(Value::from(a.as_f64() / b.as_f64())),
            }
        }
        BinaryOp::Rem => {
            if b.as_f64() == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            Ok(int_op(a, b, i64::checked_rem, |x, y| x % y))
        }
        _ => unreachable!("non-arithmetic operators handled above"),
    }
}

fn loose_eq(l: &Value, r: &Value) -> bool {
    match (Num::of(l), Num::of(r)) {
        (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
        _ => l == r,
    }
}

fn member(object: &Value, name: &str) -> Result<Value> {
    match object {
        Value::Object(map) => Ok(map.get(name).cloned().unwrap_or(Value::Null)),
        Value::Array(items) => {
            if name == "length" {
                return Ok(Value::from(items.len()));
            }
            name.parse::<usize>()
                .ok()
                .and_then(|i| items.get(i).cloned())
                .ok_or_else(|| ExprError::Type(format!("no member '{name}' on list")))
        }
        Value::String(s) if name == "length" => Ok(Value::from(s.chars().count())),
        other => Err(ExprError::Type(format!("no member '{name}' on {other}"))),
    }
}

fn index_value(object: &Value, index: &Value) -> Result<Value> {
    match (object, index) {
        (Value::Object(map), Value::String(key)) => {
            Ok(map.get(key).cloned().unwrap_or(Value::Null))
        }
        (Value::Array(items), _) => {
            let i = index
                .as_u64()
                .ok_or_else(|| ExprError::Type(format!("invalid list index {index}")))?;
            items
                .get(i as usize)
                .cloned()
                .ok_or_else(|| ExprError::Type(format!("index {i} out of range")))
        }
        (Value::String(s), _) => {
            let i = index
                .as_u64()
                .ok_or_else(|| ExprError::Type(format!("invalid string index {index}")))?;
            s.chars()
                .nth(i as usize)
                .map(|c| Value::String(c.to_string()))
                .ok_or_else(|| ExprError::Type(format!("index {i} out of range")))
        }
        _ => Err(ExprError::Type(format!("cannot index {object} with {index}"))),
    }
}

fn arity(name: &str, args: &[Value], expected: usize) -> Result<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ExprError::Type(format!(
            "{name} takes {expected} argument(s), got {}",
            args.len()
        )))
    }
}

fn numbers(name: &str, args: &[Value]) -> Result<Vec<f64>> {
    let items = match args {
        [Value::Array(items)] => items.as_slice(),
        _ => args,
    };
    if items.is_empty() {
        return Err(ExprError::Type(format!("{name} needs at least one number")));
    }
    items
        .iter()
        .map(|v| {
            Num::of(v)
                .map(Num::as_f64)
                .ok_or_else(|| ExprError::Type(format!("{name} needs numbers, got {v}")))
        })
        .collect()
}

fn narrow(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Value::from(f as i64)
    } else {
        Value::from(f)
    }
}

fn call_builtin(name: &str, args: &[Value]) -> Result<Value> {
    match name {
        "concat" => {
            if !args.is_empty() && args.iter().all(Value::is_array) {
                let joined = args
                    .iter()
                    .filter_map(Value::as_array)
                    .flatten()
                    .cloned()
                    .collect();
                return Ok(Value::Array(joined));
            }
            Ok(Value::String(args.iter().map(stringify).collect()))
        }
        "length" => {
            arity(name, args, 1)?;
            match &args[0] {
                Value::String(s) => Ok(Value::from(s.chars().count())),
                Value::Array(a) => Ok(Value::from(a.len())),
                Value::Object(o) => Ok(Value::from(o.len())),
                other => Err(ExprError::Type(format!("length of {other}"))),
            }
        }
        "isEmpty" => {
            arity(name, args, 1)?;
            Ok(Value::Bool(match &args[0] {
                Value::Null => true,
                Value::String(s) => s.is_empty(),
                Value::Array(a) => a.is_empty(),
                Value::Object(o) => o.is_empty(),
                _ => false,
            }))
        }
        "isNull" => {
            arity(name, args, 1)?;
            Ok(Value::Bool(args[0].is_null()))
        }
        "ifNull" => {
            arity(name, args, 2)?;
            Ok(if args[0].is_null() {
                args[1].clone()
            } else {
                args[0].clone()
            })
        }
        "condition" => {
            arity(name, args, 3)?;
            Ok(if is_truthy(&args[0]) {
                args[1].clone()
            } else {
                args[2].clone()
            })
        }
        "toInt" => {
            arity(name, args, 1)?;
            match &args[0] {
                Value::Bool(b) => Ok(Value::from(i64::from(*b))),
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .or_else(|_| s.trim().parse::<f64>().map(|f| Value::from(f.trunc() as i64)))
                    .map_err(|_| ExprError::Type(format!("cannot convert '{s}' to int"))),
                other => Num::of(other)
                    .map(|n| match n {
                        Num::Int(i) => Value::from(i),
                        Num::Float(f) => Value::from(f.trunc() as i64),
                    })
                    .ok_or_else(|| ExprError::Type(format!("cannot convert {other} to int"))),
            }
        }
        "toDouble" => {
            arity(name, args, 1)?;
            match &args[0] {
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::from)
                    .map_err(|_| ExprError::Type(format!("cannot convert '{s}' to double"))),
                other => Num::of(other)
                    .map(|n| Value::from(n.as_f64()))
                    .ok_or_else(|| ExprError::Type(format!("cannot convert {other} to double"))),
            }
        }
        "toString" => {
            arity(name, args, 1)?;
            Ok(Value::String(stringify(&args[0])))
        }
        "contains" => {
            arity(name, args, 2)?;
            match (&args[0], &args[1]) {
                (Value::String(s), needle) => Ok(Value::Bool(s.contains(&stringify(needle)))),
                (Value::Array(items), needle) => {
                    Ok(Value::Bool(items.iter().any(|item| loose_eq(item, needle))))
                }
                (Value::Object(map), key) => Ok(Value::Bool(map.contains_key(&stringify(key)))),
                (other, _) => Err(ExprError::Type(format!("contains on {other}"))),
            }
        }
        "upper" | "lower" => {
            arity(name, args, 1)?;
            let text = args[0]
                .as_str()
                .ok_or_else(|| ExprError::Type(format!("{name} needs a string")))?;
            Ok(Value::String(if name == "upper" {
                text.to_uppercase()
            } else {
                text.to_lowercase()
            }))
        }
        "max" => Ok(narrow(
            numbers(name, args)?.into_iter().fold(f64::MIN, f64::max),
        )),
        "min" => Ok(narrow(
            numbers(name, args)?.into_iter().fold(f64::MAX, f64::min),
        )),
        "abs" => {
            arity(name, args, 1)?;
            match Num::of(&args[0]) {
                Some(Num::Int(n)) => Ok(Value::from(n.saturating_abs())),
                Some(Num::Float(f)) => Ok(Value::from(f.abs())),
                None => Err(ExprError::Type(format!("abs of {}", args[0]))),
            }
        }
        "jsonEncode" => {
            arity(name, args, 1)?;
            Ok(Value::String(args[0].to_string()))
        }
        "jsonDecode" => {
            arity(name, args, 1)?;
            let text = args[0]
                .as_str()
                .ok_or_else(|| ExprError::Type("jsonDecode needs a string".to_string()))?;
            serde_json::from_str(text)
                .map_err(|e| ExprError::Type(format!("jsonDecode failed: {e}")))
        }
        _ => Err(ExprError::FunctionNotFound(name.to_string())),
    }
}
