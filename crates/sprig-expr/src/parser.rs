//! Recursive-descent parser for the expression language
//!
//! Precedence, loosest first: `?:`, `||`, `&&`, equality, comparison,
//! additive, multiplicative, unary, postfix (member, index, call).
//!
//! Nesting is capped at [`MAX_DEPTH`] both while parsing and in the finished
//! tree, so evaluation never recurses deeper than that.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::{ExprError, Result};
use crate::lexer::{tokenize, Token};
use serde_json::Value;

/// Deepest nesting an expression may have
pub const MAX_DEPTH: usize = 128;

/// Parse expression source into a syntax tree
pub fn parse(source: &str) -> Result<Expr> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ExprError::Syntax("empty expression".to_string()));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.conditional()?;
    if let Some(token) = parser.peek() {
        return Err(ExprError::Syntax(format!("unexpected trailing token {token:?}")));
    }
    // left-associative chains such as `a + a + ...` grow without recursing
    if expr.depth() > MAX_DEPTH {
        return Err(too_deep());
    }
    Ok(expr)
}

fn too_deep() -> ExprError {
    ExprError::Syntax(format!("expression nested deeper than {MAX_DEPTH} levels"))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(ExprError::Syntax(format!(
                "expected {expected:?}, found {token:?}"
            ))),
            None => Err(ExprError::Syntax(format!(
                "expected {expected:?}, found end of input"
            ))),
        }
    }

    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(too_deep());
        }
        Ok(())
    }

    fn conditional(&mut self) -> Result<Expr> {
        self.descend()?;
        let expr = self.ternary()?;
        self.depth -= 1;
        Ok(expr)
    }

    fn ternary(&mut self) -> Result<Expr> {
        let condition = self.binary(0)?;
        if !self.eat(&Token::Question) {
            return Ok(condition);
        }
        let then = self.conditional()?;
        self.expect(Token::Colon)?;
        let otherwise = self.conditional()?;
        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    /// Precedence climbing over the binary operator levels
    fn binary(&mut self, level: usize) -> Result<Expr> {
        const LEVELS: &[&[(Token, BinaryOp)]] = &[
            &[(Token::OrOr, BinaryOp::Or)],
            &[(Token::AndAnd, BinaryOp::And)],
            &[(Token::EqEq, BinaryOp::Eq), (Token::NotEq, BinaryOp::NotEq)],
            &[
                (Token::Lt, BinaryOp::Lt),
                (Token::Le, BinaryOp::Le),
                (Token::Gt, BinaryOp::Gt),
                (Token::Ge, BinaryOp::Ge),
            ],
            &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
            &[
                (Token::Star, BinaryOp::Mul),
                (Token::Slash, BinaryOp::Div),
                (Token::Percent, BinaryOp::Rem),
            ],
        ];

        if level == LEVELS.len() {
            return self.unary();
        }

        let mut left = self.binary(level + 1)?;
        'outer: loop {
            for (token, op) in LEVELS[level] {
                if self.eat(token) {
                    let right = self.binary(level + 1)?;
                    left = Expr::Binary {
                        left: Box::new(left),
                        op: *op,
                        right: Box::new(right),
                    };
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        let op = if self.eat(&Token::Bang) {
            UnaryOp::Not
        } else if self.eat(&Token::Minus) {
            UnaryOp::Neg
        } else {
            return self.postfix();
        };
        self.descend()?;
        let operand = self.unary()?;
        self.depth -= 1;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let name = match self.advance() {
                    Some(Token::Ident(name)) => name,
                    Some(Token::Int(n)) => n.to_string(),
                    other => {
                        return Err(ExprError::Syntax(format!(
                            "expected member name after '.', found {other:?}"
                        )))
                    }
                };
                expr = Expr::Member {
                    object: Box::new(expr),
                    name,
                };
            } else if self.eat(&Token::LBracket) {
                let index = self.conditional()?;
                self.expect(Token::RBracket)?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.peek() == Some(&Token::LParen) {
                let Expr::Variable(name) = expr else {
                    return Err(ExprError::Syntax(
                        "only named functions can be called".to_string(),
                    ));
                };
                self.pos += 1;
                let args = self.comma_list(Token::RParen)?;
                expr = Expr::Call { name, args };
            } else {
                return Ok(expr);
            }
        }
    }

    fn comma_list(&mut self, close: Token) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        if self.eat(&close) {
            return Ok(items);
        }
        loop {
            items.push(self.conditional()?);
            if self.eat(&close) {
                return Ok(items);
            }
            self.expect(Token::Comma)?;
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        let token = self
            .advance()
            .ok_or_else(|| ExprError::Syntax("unexpected end of input".to_string()))?;
        match token {
            Token::Int(n) => Ok(Expr::Literal(Value::from(n))),
            Token::Float(f) => Ok(Expr::Literal(Value::from(f))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Null => Ok(Expr::Literal(Value::Null)),
            Token::Ident(name) => Ok(Expr::Variable(name)),
            Token::LParen => {
                let inner = self.conditional()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => Ok(Expr::List(self.comma_list(Token::RBracket)?)),
            Token::LBrace => {
                let mut entries = Vec::new();
                if self.eat(&Token::RBrace) {
                    return Ok(Expr::Map(entries));
                }
                loop {
                    let key = match self.peek() {
                        // bare identifiers are string keys: {a: 1}
                        Some(Token::Ident(name)) => {
                            let key = Expr::Literal(Value::String(name.clone()));
                            self.pos += 1;
                            key
                        }
                        _ => self.conditional()?,
                    };
                    self.expect(Token::Colon)?;
                    let value = self.conditional()?;
                    entries.push((key, value));
                    if self.eat(&Token::RBrace) {
                        return Ok(Expr::Map(entries));
                    }
                    self.expect(Token::Comma)?;
                }
            }
            other => Err(ExprError::Syntax(format!("unexpected token {other:?}"))),
        }
    }
}
