//! Expression syntax tree

use serde_json::Value;

/// Binary operators, lowest precedence last in the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// A parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Variable(String),
    List(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
    Member {
        object: Box<Expr>,
        name: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

impl Expr {
    /// Nesting depth of the tree, a leaf being 1
    ///
    /// Walks with an explicit stack so arbitrarily deep trees are safe to
    /// measure.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1)];
        while let Some((expr, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            let next = depth + 1;
            match expr {
                Expr::Literal(_) | Expr::Variable(_) => {}
                Expr::List(items) | Expr::Call { args: items, .. } => {
                    pending.extend(items.iter().map(|item| (item, next)));
                }
                Expr::Map(entries) => {
                    for (key, value) in entries {
                        pending.push((key, next));
                        pending.push((value, next));
                    }
                }
                Expr::Member { object, .. } => pending.push((object, next)),
                Expr::Unary { operand, .. } => pending.push((operand, next)),
                Expr::Index { object, index } => {
                    pending.push((object, next));
                    pending.push((index, next));
                }
                Expr::Binary { left, right, .. } => {
                    pending.push((left, next));
                    pending.push((right, next));
                }
                Expr::Conditional {
                    condition,
                    then,
                    otherwise,
                } => {
                    pending.push((condition, next));
                    pending.push((then, next));
                    pending.push((otherwise, next));
                }
            }
        }
        deepest
    }
}
