// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Recursive descent parser for dynamics expressions
//!
//! Precedence, lowest first: `||`, `&&`, comparisons, `+ -`, `* /`,
//! unary `- !`, `^` (right associative).

use super::lexer::{tokenize, Token, TokenKind};
use super::{BinaryOperator, Expr, ExpressionError, UnaryOperator};

type ParseResult<T> = Result<T, ExpressionError>;

struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[self.current - 1]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(&kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> ExpressionError {
        let token = self.peek();
        ExpressionError::UnexpectedToken {
            expected: expected.to_string(),
            found: token.kind.to_string(),
            column: token.column,
        }
    }

    fn consume(&mut self, kind: TokenKind, expected: &str) -> ParseResult<()> {
        if self.match_token(kind) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn parse_complete(&mut self) -> ParseResult<Expr> {
        if self.is_at_end() {
            return Err(ExpressionError::Empty);
        }
        let expr = self.parse_or()?;
        if !self.is_at_end() {
            return Err(self.unexpected("end of expression"));
        }
        Ok(expr)
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_and()?;
        while self.match_token(TokenKind::OrOr) {
            let right = self.parse_and()?;
            expr = Expr::binary(BinaryOperator::Or, expr, right);
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_comparison()?;
        while self.match_token(TokenKind::AndAnd) {
            let right = self.parse_comparison()?;
            expr = Expr::binary(BinaryOperator::And, expr, right);
        }
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_additive()?;
        if let Some(op) = self.parse_comparison_op() {
            let right = self.parse_additive()?;
            return Ok(Expr::binary(op, expr, right));
        }
        Ok(expr)
    }

    fn parse_comparison_op(&mut self) -> Option<BinaryOperator> {
        let op = match self.peek().kind {
            TokenKind::Less => BinaryOperator::Less,
            TokenKind::LessEqual => BinaryOperator::LessEqual,
            TokenKind::Greater => BinaryOperator::Greater,
            TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
            TokenKind::EqualEqual => BinaryOperator::Equal,
            TokenKind::NotEqual => BinaryOperator::NotEqual,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_multiplicative()?;
        loop {
            let op = if self.match_token(TokenKind::Plus) {
                BinaryOperator::Add
            } else if self.match_token(TokenKind::Minus) {
                BinaryOperator::Subtract
            } else {
                break;
            };
            let right = self.parse_multiplicative()?;
            expr = Expr::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = if self.match_token(TokenKind::Star) {
                BinaryOperator::Multiply
            } else if self.match_token(TokenKind::Slash) {
                BinaryOperator::Divide
            } else {
                break;
            };
            let right = self.parse_unary()?;
            expr = Expr::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.match_token(TokenKind::Minus) {
            let operand = self.parse_unary()?;
            return Ok(Expr::unary(UnaryOperator::Negate, operand));
        }
        if self.match_token(TokenKind::Bang) {
            let operand = self.parse_unary()?;
            return Ok(Expr::unary(UnaryOperator::Not, operand));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> ParseResult<Expr> {
        let base = self.parse_primary()?;
        if self.match_token(TokenKind::Caret) {
            let exponent = self.parse_unary()?;
            return Ok(Expr::binary(BinaryOperator::Power, base, exponent));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match self.peek().kind.clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if self.match_token(TokenKind::LeftParen) {
                    self.parse_call(name)
                } else {
                    Ok(Expr::Symbol(name))
                }
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_or()?;
                self.consume(TokenKind::RightParen, ")")?;
                Ok(expr)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_call(&mut self, function: String) -> ParseResult<Expr> {
        let mut args = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                args.push(self.parse_or()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, ")")?;
        Ok(Expr::Call { function, args })
    }
}

/// Parse an expression string into an [`Expr`]
pub fn parse_expression(input: &str) -> Result<Expr, ExpressionError> {
    let tokens = tokenize(input)?;
    Parser::new(tokens).parse_complete()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str) -> Expr {
        Expr::Symbol(name.to_string())
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expression("a + b * c").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOperator::Add,
                sym("a"),
                Expr::binary(BinaryOperator::Multiply, sym("b"), sym("c"))
            )
        );
    }

    #[test]
    fn test_unary_binds_looser_than_power() {
        let expr = parse_expression("-SV1 ^ 2").unwrap();
        assert_eq!(
            expr,
            Expr::unary(
                UnaryOperator::Negate,
                Expr::binary(BinaryOperator::Power, sym("SV1"), Expr::Number(2.0))
            )
        );
    }

    #[test]
    fn test_power_is_right_associative() {
        let expr = parse_expression("a ^ b ^ c").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOperator::Power,
                sym("a"),
                Expr::binary(BinaryOperator::Power, sym("b"), sym("c"))
            )
        );
    }

    #[test]
    fn test_function_call() {
        let expr = parse_expression("P*pow(wmax - wsyn, muLTP)").unwrap();
        match expr {
            Expr::Binary { right, .. } => match *right {
                Expr::Call { function, args } => {
                    assert_eq!(function, "pow");
                    assert_eq!(args.len(), 2);
                }
                other => panic!("expected call, got {:?}", other),
            },
            other => panic!("expected product, got {:?}", other),
        }
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        let err = parse_expression("a b").unwrap_err();
        assert!(matches!(err, ExpressionError::UnexpectedToken { column: 3, .. }));
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(parse_expression("   ").unwrap_err(), ExpressionError::Empty);
    }

    #[test]
    fn test_unbalanced_parenthesis() {
        assert!(parse_expression("(a + b").is_err());
    }
}
