//! Sprig expression layer
//!
//! Action descriptors carry values that are either literals or expressions
//! wrapped in `@{ ... }`. This crate owns the pieces needed to turn those into
//! concrete values at execution time:
//!
//! - [`ExprOr`] - a literal or unevaluated expression text
//! - [`ScopeContext`] - the hierarchical, read-only variable environment
//! - [`evaluate`] / [`evaluate_nested_expressions`] - best-effort evaluation
//!   that degrades to `None` instead of failing
//!
//! # Example
//!
//! ```ignore
//! use sprig_expr::{ExprOr, ScopeContext};
//! use serde_json::json;
//!
//! let scope = ScopeContext::new("page").with_var("count", json!(2));
//! let expr: ExprOr<i64> = ExprOr::expression("count * 21");
//! assert_eq!(expr.evaluate(Some(&scope)), Some(42));
//! ```

pub mod ast;
pub mod coerce;
pub mod error;
pub mod eval;
pub mod expr_or;
pub mod lexer;
pub mod nested;
pub mod parser;
pub mod scope;

pub use coerce::FromDynamic;
pub use error::{ExprError, Result};
pub use eval::{evaluate, is_truthy, stringify, try_evaluate};
pub use expr_or::{evaluate_as, is_expression, unescape, ExprOr};
pub use nested::evaluate_nested_expressions;
pub use scope::{ScopeContext, VariableSource};

#[doc(hidden)]
pub mod __private {
    pub use serde_json::Value;
}
