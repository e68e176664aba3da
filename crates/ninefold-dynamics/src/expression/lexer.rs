// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Tokenizer for dynamics expressions

use super::ExpressionError;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit0, digit1, multispace1, one_of},
    combinator::{map, opt, recognize},
    sequence::{pair, tuple},
    IResult,
};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Identifier(String),

    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    EqualEqual,
    NotEqual,
    AndAnd,
    OrOr,
    Bang,

    LeftParen,
    RightParen,
    Comma,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::Identifier(s) => write!(f, "identifier '{}'", s),
            TokenKind::Eof => write!(f, "end of expression"),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Split an expression string into tokens, terminated by `Eof`
pub fn tokenize(input: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut remaining = input;
    let mut column = 1;

    while !remaining.is_empty() {
        if let Ok((rest, skipped)) = multispace1::<_, nom::error::Error<_>>(remaining) {
            column += skipped.chars().count();
            remaining = rest;
            continue;
        }

        match parse_token(remaining) {
            Ok((rest, (kind, lexeme))) => {
                tokens.push(Token { kind, column });
                column += lexeme.chars().count();
                remaining = rest;
            }
            Err(_) => {
                return Err(ExpressionError::UnexpectedCharacter {
                    character: remaining.chars().next().unwrap_or_default(),
                    column,
                });
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        column,
    });

    Ok(tokens)
}

fn parse_token(input: &str) -> IResult<&str, (TokenKind, &str)> {
    alt((parse_number, parse_identifier, parse_operator, parse_delimiter))(input)
}

fn parse_number(input: &str) -> IResult<&str, (TokenKind, &str)> {
    let exponent = tuple((one_of("eE"), opt(one_of("+-")), digit1));
    let (rest, text) = alt((
        recognize(tuple((
            digit1,
            opt(pair(char('.'), digit0)),
            opt(exponent),
        ))),
        recognize(tuple((
            char('.'),
            digit1,
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
    ))(input)?;

    let value = text.parse::<f64>().map_err(|_| {
        nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Float))
    })?;

    Ok((rest, (TokenKind::Number(value), text)))
}

fn parse_identifier(input: &str) -> IResult<&str, (TokenKind, &str)> {
    let (rest, id) = recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)?;

    Ok((rest, (TokenKind::Identifier(id.to_string()), id)))
}

fn parse_operator(input: &str) -> IResult<&str, (TokenKind, &str)> {
    alt((
        map(tag("<="), |s| (TokenKind::LessEqual, s)),
        map(tag(">="), |s| (TokenKind::GreaterEqual, s)),
        map(tag("=="), |s| (TokenKind::EqualEqual, s)),
        map(tag("!="), |s| (TokenKind::NotEqual, s)),
        map(tag("&&"), |s| (TokenKind::AndAnd, s)),
        map(tag("||"), |s| (TokenKind::OrOr, s)),
        map(tag("**"), |s| (TokenKind::Caret, s)),
        map(char('+'), |_| (TokenKind::Plus, "+")),
        map(char('-'), |_| (TokenKind::Minus, "-")),
        map(char('*'), |_| (TokenKind::Star, "*")),
        map(char('/'), |_| (TokenKind::Slash, "/")),
        map(char('^'), |_| (TokenKind::Caret, "^")),
        map(char('<'), |_| (TokenKind::Less, "<")),
        map(char('>'), |_| (TokenKind::Greater, ">")),
        map(char('!'), |_| (TokenKind::Bang, "!")),
    ))(input)
}

fn parse_delimiter(input: &str) -> IResult<&str, (TokenKind, &str)> {
    alt((
        map(char('('), |_| (TokenKind::LeftParen, "(")),
        map(char(')'), |_| (TokenKind::RightParen, ")")),
        map(char(','), |_| (TokenKind::Comma, ",")),
    ))(input)
}
