// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Structural queries used by the linearity check

use super::{BinaryOperator, Expr, UnaryOperator};
use std::collections::BTreeSet;

/// Polynomial degree of `expr` in `variables`
///
/// Returns `None` when the expression is not a polynomial in those variables
/// (division by a variable, a variable inside a function call, a
/// non-integer power of a variable, ...).
pub fn polynomial_degree(expr: &Expr, variables: &BTreeSet<String>) -> Option<u32> {
    match expr {
        Expr::Number(_) => Some(0),
        Expr::Symbol(name) => Some(u32::from(variables.contains(name))),
        Expr::Unary { op, operand } => {
            let degree = polynomial_degree(operand, variables)?;
            match op {
                UnaryOperator::Negate => Some(degree),
                UnaryOperator::Not => constant_only(degree),
            }
        }
        Expr::Binary { op, left, right } => {
            let left_degree = polynomial_degree(left, variables);
            let right_degree = polynomial_degree(right, variables);
            match op {
                BinaryOperator::Add | BinaryOperator::Subtract => {
                    Some(left_degree?.max(right_degree?))
                }
                BinaryOperator::Multiply => Some(left_degree? + right_degree?),
                BinaryOperator::Divide => match right_degree? {
                    0 => left_degree,
                    _ => None,
                },
                BinaryOperator::Power => {
                    let base = left_degree?;
                    if base == 0 {
                        return constant_only(right_degree?);
                    }
                    match right.as_ref() {
                        Expr::Number(n) if *n >= 0.0 && n.fract() == 0.0 => {
                            Some(base * (*n as u32))
                        }
                        _ => None,
                    }
                }
                _ => constant_only(left_degree?.max(right_degree?)),
            }
        }
        Expr::Call { args, .. } => {
            let mut degree = 0;
            for arg in args {
                degree = degree.max(polynomial_degree(arg, variables)?);
            }
            constant_only(degree)
        }
    }
}

fn constant_only(degree: u32) -> Option<u32> {
    if degree == 0 {
        Some(0)
    } else {
        None
    }
}

/// A summand of an additive expression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Term<'a> {
    pub negated: bool,
    pub expr: &'a Expr,
}

/// Split `expr` into its top level `+`/`-` summands
pub fn additive_terms(expr: &Expr) -> Vec<Term<'_>> {
    let mut terms = Vec::new();
    collect_terms(expr, false, &mut terms);
    terms
}

fn collect_terms<'a>(expr: &'a Expr, negated: bool, terms: &mut Vec<Term<'a>>) {
    match expr {
        Expr::Binary {
            op: BinaryOperator::Add,
            left,
            right,
        } => {
            collect_terms(left, negated, terms);
            collect_terms(right, negated, terms);
        }
        Expr::Binary {
            op: BinaryOperator::Subtract,
            left,
            right,
        } => {
            collect_terms(left, negated, terms);
            collect_terms(right, !negated, terms);
        }
        Expr::Unary {
            op: UnaryOperator::Negate,
            operand,
        } => collect_terms(operand, !negated, terms),
        _ => terms.push(Term { negated, expr }),
    }
}

/// True when `rhs` has the shape `target (+|-) f` with `f` free of `variables`
pub fn is_increment_of(rhs: &Expr, target: &str, variables: &BTreeSet<String>) -> bool {
    let terms = additive_terms(rhs);
    let mut seen_target = false;
    for term in terms {
        match term.expr {
            Expr::Symbol(name) if name == target && !term.negated && !seen_target => {
                seen_target = true;
            }
            other => {
                if other.symbols().iter().any(|s| variables.contains(s)) {
                    return false;
                }
            }
        }
    }
    seen_target
}
