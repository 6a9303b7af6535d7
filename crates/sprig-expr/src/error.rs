//! Error types for expression parsing and evaluation
//!
//! These never cross the public `evaluate*` boundary: callers of the
//! best-effort API see `None`. They are surfaced by the `try_*` variants and
//! in `tracing` output.

use thiserror::Error;

/// Error type for expression handling
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExprError {
    /// Unexpected character while tokenizing
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    /// String literal was not closed
    #[error("unterminated string literal starting at offset {0}")]
    UnterminatedString(usize),

    /// Token stream did not match the grammar
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Identifier not bound in any scope frame
    #[error("variable not found: {0}")]
    VariableNotFound(String),

    /// Call to a function that is not a builtin
    #[error("function not found: {0}")]
    FunctionNotFound(String),

    /// Operator or builtin applied to values of the wrong shape
    #[error("type error: {0}")]
    Type(String),

    /// Division or remainder by zero
    #[error("division by zero")]
    DivisionByZero,
}

/// Result type for expression operations
pub type Result<T> = std::result::Result<T, ExprError>;
