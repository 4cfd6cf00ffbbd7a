//! Recursive-descent parser for expressions such as `exp(-alpha*pi^2*t)*sin(pi*x)`.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | power
//! power   := primary ('^' unary)?
//! primary := number | ident | ident '(' expr ')' | '(' expr ')'
//! ```
//!
//! `^` (or `**`) is right-associative and binds tighter than unary minus, so
//! `-x^2` is `-(x^2)` and `2^-1` is `0.5`. `pi` and `e` are constants.

use std::f64::consts::{E, PI};

use thiserror::Error;

use super::expr::{Expr, Func};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unexpected character `{ch}` at {pos}")]
    UnexpectedChar { pos: usize, ch: char },
    #[error("expected {expected} at {pos}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: &'static str,
        found: String,
    },
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: &'static str },
    #[error("unknown function `{name}`")]
    UnknownFunction { name: String },
    #[error("invalid number `{text}`")]
    InvalidNumber { text: String },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(v) => format!("number {v}"),
            Token::Ident(s) => format!("`{s}`"),
            Token::Plus => "`+`".into(),
            Token::Minus => "`-`".into(),
            Token::Star => "`*`".into(),
            Token::Slash => "`/`".into(),
            Token::Caret => "`^`".into(),
            Token::LParen => "`(`".into(),
            Token::RParen => "`)`".into(),
        }
    }
}

fn tokenize(src: &str) -> Result<Vec<(usize, Token)>, ParseError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let start = i;
        let token = match c {
            ' ' | '\t' | '\n' | '\r' => {
                i += 1;
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                Token::Caret
            }
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Caret,
            '(' => Token::LParen,
            ')' => Token::RParen,
            c if c.is_ascii_digit() || c == '.' => {
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Exponent part, only if digits follow
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| ParseError::InvalidNumber { text: text.clone() })?;
                tokens.push((start, Token::Number(value)));
                continue;
            }
            c if c.is_alphabetic() || c == '_' => {
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push((start, Token::Ident(chars[start..i].iter().collect())));
                continue;
            }
            other => return Err(ParseError::UnexpectedChar { pos: i, ch: other }),
        };
        tokens.push((start, token));
        i += 1;
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn next(&mut self) -> Option<(usize, Token)> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, want: Token, expected: &'static str) -> Result<(), ParseError> {
        match self.next() {
            Some((_, t)) if t == want => Ok(()),
            Some((pos, t)) => Err(ParseError::UnexpectedToken {
                pos,
                expected,
                found: t.describe(),
            }),
            None => Err(ParseError::UnexpectedEnd { expected }),
        }
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    lhs = lhs + self.term()?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    lhs = lhs - self.term()?;
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    lhs = lhs * self.unary()?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    lhs = lhs / self.unary()?;
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, ParseError> {
        let base = self.primary()?;
        if self.peek() == Some(&Token::Caret) {
            self.pos += 1;
            let exp = self.unary()?;
            return Ok(base.pow(exp));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        const EXPECTED: &str = "a number, name or `(`";
        match self.next() {
            Some((_, Token::Number(v))) => Ok(Expr::Const(v)),
            Some((_, Token::Ident(name))) => {
                if self.peek() == Some(&Token::LParen) {
                    let func = Func::from_name(&name)
                        .ok_or_else(|| ParseError::UnknownFunction { name: name.clone() })?;
                    self.pos += 1;
                    let arg = self.expr()?;
                    self.expect(Token::RParen, "`)`")?;
                    return Ok(arg.apply(func));
                }
                Ok(match name.as_str() {
                    "pi" => Expr::Const(PI),
                    "e" => Expr::Const(E),
                    _ => Expr::Symbol(name),
                })
            }
            Some((_, Token::LParen)) => {
                let inner = self.expr()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(inner)
            }
            Some((pos, t)) => Err(ParseError::UnexpectedToken {
                pos,
                expected: EXPECTED,
                found: t.describe(),
            }),
            None => Err(ParseError::UnexpectedEnd { expected: EXPECTED }),
        }
    }
}

/// Parse `src` into an expression tree.
pub fn parse(src: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser {
        tokens: tokenize(src)?,
        pos: 0,
    };
    let expr = parser.expr()?;
    match parser.next() {
        None => Ok(expr),
        Some((pos, t)) => Err(ParseError::UnexpectedToken {
            pos,
            expected: "end of input",
            found: t.describe(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::expr::Bindings;

    fn eval(src: &str, vars: &[(&str, f64)]) -> f64 {
        let bindings: Bindings = vars.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        parse(src).unwrap().eval(&bindings).unwrap()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("1 + 2 * 3", &[]), 7.0);
        assert_eq!(eval("(1 + 2) * 3", &[]), 9.0);
        assert_eq!(eval("2 ^ 3 ^ 2", &[]), 512.0);
        assert_eq!(eval("-2^2", &[]), -4.0);
        assert_eq!(eval("2^-1", &[]), 0.5);
        assert_eq!(eval("2**3", &[]), 8.0);
        assert_eq!(eval("8 / 4 / 2", &[]), 1.0);
    }

    #[test]
    fn test_constants_functions_and_symbols() {
        assert!((eval("sin(pi/2)", &[]) - 1.0).abs() < 1e-15);
        assert!((eval("ln(e)", &[]) - 1.0).abs() < 1e-15);
        assert!((eval("1.5e-1 * x", &[("x", 2.0)]) - 0.3).abs() < 1e-15);
        let v = eval("exp(-alpha*pi^2*t)*sin(pi*x)", &[("alpha", 0.01), ("t", 0.5), ("x", 0.5)]);
        assert!((v - (-0.01 * PI * PI * 0.5_f64).exp()).abs() < 1e-15);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(parse("1 +"), Err(ParseError::UnexpectedEnd { .. })));
        assert!(matches!(parse("foo(x)"), Err(ParseError::UnknownFunction { .. })));
        assert!(matches!(parse("1 $ 2"), Err(ParseError::UnexpectedChar { ch: '$', .. })));
        assert!(matches!(parse("(x"), Err(ParseError::UnexpectedEnd { .. })));
        assert!(matches!(parse("x y"), Err(ParseError::UnexpectedToken { .. })));
    }
}
