// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Mathematical expressions used by aliases, time derivatives, triggers and
//! state assignments
//!
//! Expressions are parsed once when a [`Dynamics`](crate::Dynamics) is built
//! and kept as an AST afterwards. They serialize back to their infix text.

pub mod analysis;
mod lexer;
mod parser;

pub use parser::parse_expression;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Identifiers every expression may use without declaring them
pub const BUILTIN_SYMBOLS: [&str; 2] = ["t", "pi"];

pub fn is_builtin_symbol(name: &str) -> bool {
    BUILTIN_SYMBOLS.contains(&name)
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionError {
    #[error("unexpected character '{character}' at column {column}")]
    UnexpectedCharacter { character: char, column: usize },

    #[error("expected {expected} but found {found} at column {column}")]
    UnexpectedToken {
        expected: String,
        found: String,
        column: usize,
    },

    #[error("empty expression")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Negate,
    Not,
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Negate => "-",
            UnaryOperator::Not => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    And,
    Or,
}

const PRECEDENCE_UNARY: u8 = 6;
const PRECEDENCE_ATOM: u8 = 8;

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "^",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::Or => 1,
            BinaryOperator::And => 2,
            BinaryOperator::Less
            | BinaryOperator::LessEqual
            | BinaryOperator::Greater
            | BinaryOperator::GreaterEqual
            | BinaryOperator::Equal
            | BinaryOperator::NotEqual => 3,
            BinaryOperator::Add | BinaryOperator::Subtract => 4,
            BinaryOperator::Multiply | BinaryOperator::Divide => 5,
            BinaryOperator::Power => 7,
        }
    }

    pub fn is_comparison(&self) -> bool {
        self.precedence() == 3
    }
}

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Expr {
    Number(f64),
    Symbol(String),
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        function: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn parse(input: &str) -> Result<Self, ExpressionError> {
        parse_expression(input)
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Expr::Symbol(name.into())
    }

    pub fn unary(op: UnaryOperator, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Left fold of `terms` with `op`, or `identity` when there are none
    pub fn fold(op: BinaryOperator, terms: Vec<Expr>, identity: f64) -> Self {
        let mut iter = terms.into_iter();
        match iter.next() {
            Some(first) => iter.fold(first, |acc, term| Expr::binary(op, acc, term)),
            None => Expr::Number(identity),
        }
    }

    /// Free identifiers, including `t` and `pi` (function names excluded)
    pub fn symbols(&self) -> BTreeSet<String> {
        let mut symbols = BTreeSet::new();
        self.collect_symbols(&mut symbols);
        symbols
    }

    fn collect_symbols(&self, symbols: &mut BTreeSet<String>) {
        match self {
            Expr::Number(_) => {}
            Expr::Symbol(name) => {
                symbols.insert(name.clone());
            }
            Expr::Unary { operand, .. } => operand.collect_symbols(symbols),
            Expr::Binary { left, right, .. } => {
                left.collect_symbols(symbols);
                right.collect_symbols(symbols);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_symbols(symbols);
                }
            }
        }
    }

    pub fn references(&self, name: &str) -> bool {
        match self {
            Expr::Number(_) => false,
            Expr::Symbol(symbol) => symbol == name,
            Expr::Unary { operand, .. } => operand.references(name),
            Expr::Binary { left, right, .. } => left.references(name) || right.references(name),
            Expr::Call { args, .. } => args.iter().any(|arg| arg.references(name)),
        }
    }

    /// Rewrite every identifier through `rename`
    pub fn map_symbols<F>(&self, rename: &F) -> Expr
    where
        F: Fn(&str) -> String,
    {
        match self {
            Expr::Number(n) => Expr::Number(*n),
            Expr::Symbol(name) => Expr::Symbol(rename(name)),
            Expr::Unary { op, operand } => Expr::unary(*op, operand.map_symbols(rename)),
            Expr::Binary { op, left, right } => {
                Expr::binary(*op, left.map_symbols(rename), right.map_symbols(rename))
            }
            Expr::Call { function, args } => Expr::Call {
                function: function.clone(),
                args: args.iter().map(|arg| arg.map_symbols(rename)).collect(),
            },
        }
    }

    pub fn rename_symbol(&self, old: &str, new: &str) -> Expr {
        self.map_symbols(&|name: &str| {
            if name == old {
                new.to_string()
            } else {
                name.to_string()
            }
        })
    }

    /// Replace identifiers found in `replacements` by their expressions
    pub fn substitute(&self, replacements: &BTreeMap<String, Expr>) -> Expr {
        match self {
            Expr::Number(n) => Expr::Number(*n),
            Expr::Symbol(name) => replacements
                .get(name)
                .cloned()
                .unwrap_or_else(|| Expr::Symbol(name.clone())),
            Expr::Unary { op, operand } => Expr::unary(*op, operand.substitute(replacements)),
            Expr::Binary { op, left, right } => Expr::binary(
                *op,
                left.substitute(replacements),
                right.substitute(replacements),
            ),
            Expr::Call { function, args } => Expr::Call {
                function: function.clone(),
                args: args.iter().map(|arg| arg.substitute(replacements)).collect(),
            },
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Number(n) if *n < 0.0 => PRECEDENCE_UNARY,
            Expr::Number(_) | Expr::Symbol(_) | Expr::Call { .. } => PRECEDENCE_ATOM,
            Expr::Unary { .. } => PRECEDENCE_UNARY,
            Expr::Binary { op, .. } => op.precedence(),
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parenthesize: bool) -> fmt::Result {
        if parenthesize {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Symbol(name) => write!(f, "{}", name),
            Expr::Unary { op, operand } => {
                write!(f, "{}", op.symbol())?;
                operand.fmt_operand(f, operand.precedence() < PRECEDENCE_UNARY)
            }
            Expr::Binary { op, left, right } => {
                let prec = op.precedence();
                let (left_parens, right_parens) = if *op == BinaryOperator::Power {
                    (left.precedence() <= prec, right.precedence() < PRECEDENCE_UNARY)
                } else {
                    let left_parens = left.precedence() < prec
                        || (op.is_comparison() && left.precedence() == prec);
                    (left_parens, right.precedence() <= prec)
                };
                left.fmt_operand(f, left_parens)?;
                write!(f, " {} ", op.symbol())?;
                right.fmt_operand(f, right_parens)
            }
            Expr::Call { function, args } => {
                write!(f, "{}(", function)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl FromStr for Expr {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_expression(s)
    }
}

impl From<Expr> for String {
    fn from(expr: Expr) -> Self {
        expr.to_string()
    }
}

impl TryFrom<String> for Expr {
    type Error = ExpressionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_expression(&value)
    }
}
