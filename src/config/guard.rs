//! Guard expressions attached to configuration section headers.
//!
//! A guard is a small boolean expression over the fact environment:
//!
//! ```text
//! distribution == 'debian' and version >= v('10.1')
//! not distribution == d('fedora', 'rhel') or 'arch' in distribution
//! ```
//!
//! Identifiers bind only to facts and calls only to the built-in
//! constructors `d(part, ...)` (a [`Distribution`]) and `v(text)` (a
//! [`Version`]). Distributions compare equal when their ID paths intersect;
//! versions order component by component.
use std::cmp::Ordering;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use serde::{Serialize, Serializer};
use thiserror::Error;

use super::Facts;
use crate::platform::{Distribution, Version};

/// A fact or an intermediate result of guard evaluation.
#[derive(Debug, Clone)]
pub enum Value {
    /// `True` / `False`.
    Bool(bool),
    /// A non-negative integer literal.
    Int(i64),
    /// A string.
    Str(String),
    /// A version.
    Version(Version),
    /// A distribution identity.
    Distribution(Distribution),
}

impl Value {
    /// Truthiness used for the final guard result and for `and`/`or`/`not`.
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Str(s) => !s.is_empty(),
            Self::Version(v) => !v.components().is_empty(),
            Self::Distribution(d) => !d.parts().is_empty(),
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Str(_) => "str",
            Self::Version(_) => "version",
            Self::Distribution(_) => "distribution",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Version(v) => write!(f, "{v}"),
            Self::Distribution(d) => write!(f, "{}", d.identity()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Str(s) => serializer.serialize_str(s),
            Self::Version(v) => v.serialize(serializer),
            Self::Distribution(d) => d.serialize(serializer),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Version> for Value {
    fn from(v: Version) -> Self {
        Self::Version(v)
    }
}

impl From<Distribution> for Value {
    fn from(d: Distribution) -> Self {
        Self::Distribution(d)
    }
}

/// Errors raised while compiling or evaluating a guard.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// The expression is malformed.
    #[error("syntax error: {0}")]
    Syntax(String),
    /// An identifier is neither a fact nor a built-in.
    #[error("name '{0}' is not defined")]
    Name(String),
    /// Operands of incompatible kinds.
    #[error("type error: {0}")]
    Type(String),
    /// A built-in received an argument it cannot interpret.
    #[error("value error: {0}")]
    Value(String),
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Str(String),
    Int(i64),
    Ident(String),
    Op(CmpOp),
    LParen,
    RParen,
    Comma,
    And,
    Or,
    Not,
    In,
    True,
    False,
}

#[derive(Debug, Clone)]
enum Expr {
    Literal(Value),
    Name(String),
    Call(String, Vec<Self>),
    Not(Box<Self>),
    And(Box<Self>, Box<Self>),
    Or(Box<Self>, Box<Self>),
    Compare(CmpOp, Box<Self>, Box<Self>),
}

/// A compiled guard expression.
///
/// # Examples
///
/// ```
/// use dotfiles_features::config::{Facts, guard::Guard};
/// use dotfiles_features::platform::{Distribution, Version};
///
/// let mut facts = Facts::new();
/// facts.insert("distribution", Distribution::new("Debian", ["debian"]));
/// facts.insert("version", "12".parse::<Version>().unwrap());
///
/// let guard = Guard::compile("distribution == 'debian' and version >= v('11')").unwrap();
/// assert!(guard.evaluate(&facts).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct Guard {
    source: String,
    expr: Expr,
}

impl Guard {
    /// A guard that always holds (headers without a separator).
    #[must_use]
    pub fn always() -> Self {
        Self {
            source: "True".to_string(),
            expr: Expr::Literal(Value::Bool(true)),
        }
    }

    /// Compile an expression.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Syntax`] if the expression is malformed.
    pub fn compile(source: &str) -> Result<Self, GuardError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(GuardError::Syntax(format!(
                "unexpected trailing input at {token:?}"
            )));
        }
        Ok(Self {
            source: source.trim().to_string(),
            expr,
        })
    }

    /// The expression text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against the fact environment.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown names, incompatible operand kinds, or
    /// invalid built-in arguments.
    pub fn evaluate(&self, facts: &Facts) -> Result<bool, GuardError> {
        Ok(eval(&self.expr, facts)?.truthy())
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

fn tokenize(source: &str) -> Result<Vec<Token>, GuardError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' | ')' | ',' => {
                chars.next();
                tokens.push(match c {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    _ => Token::Comma,
                });
            }
            '\'' | '"' => {
                chars.next();
                tokens.push(Token::Str(lex_string(&mut chars, c)?));
            }
            '0'..='9' => {
                let mut digits = String::new();
                while let Some(d) = chars.next_if(char::is_ascii_digit) {
                    digits.push(d);
                }
                let n = digits
                    .parse::<i64>()
                    .map_err(|_| GuardError::Syntax(format!("integer out of range: {digits}")))?;
                tokens.push(Token::Int(n));
            }
            '=' | '!' | '<' | '>' => {
                chars.next();
                let followed_by_eq = chars.next_if_eq(&'=').is_some();
                let op = match (c, followed_by_eq) {
                    ('=', true) => CmpOp::Eq,
                    ('!', true) => CmpOp::Ne,
                    ('<', true) => CmpOp::Le,
                    ('<', false) => CmpOp::Lt,
                    ('>', true) => CmpOp::Ge,
                    ('>', false) => CmpOp::Gt,
                    _ => {
                        return Err(GuardError::Syntax(format!(
                            "unexpected '{c}'; comparisons use ==, !=, <, <=, >, >="
                        )));
                    }
                };
                tokens.push(Token::Op(op));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(w) = chars.next_if(|w| w.is_alphanumeric() || *w == '_') {
                    word.push(w);
                }
                tokens.push(match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "in" => Token::In,
                    "True" => Token::True,
                    "False" => Token::False,
                    _ => Token::Ident(word),
                });
            }
            other => {
                return Err(GuardError::Syntax(format!(
                    "unexpected character '{other}'"
                )));
            }
        }
    }

    Ok(tokens)
}

/// Read a quoted string; the opening quote has already been consumed.
fn lex_string(chars: &mut Peekable<Chars<'_>>, quote: char) -> Result<String, GuardError> {
    let mut out = String::new();
    loop {
        match chars.next() {
            None => return Err(GuardError::Syntax("unterminated string".to_string())),
            Some(c) if c == quote => return Ok(out),
            Some('\\') => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(c @ ('\\' | '\'' | '"')) => out.push(c),
                Some(c) => {
                    out.push('\\');
                    out.push(c);
                }
                None => return Err(GuardError::Syntax("unterminated string".to_string())),
            },
            Some(c) => out.push(c),
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_second(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
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

    fn expect(&mut self, expected: &Token) -> Result<(), GuardError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(GuardError::Syntax(format!(
                "expected {expected:?}, found {:?}",
                self.peek()
            )))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, GuardError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, GuardError> {
        let mut left = self.parse_not()?;
        while self.eat(&Token::And) {
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, GuardError> {
        if self.eat(&Token::Not) {
            Ok(Expr::Not(Box::new(self.parse_not()?)))
        } else {
            self.parse_comparison()
        }
    }

    fn comparison_operator(&mut self) -> Option<CmpOp> {
        let op = match (self.peek(), self.peek_second()) {
            (Some(Token::Op(op)), _) => *op,
            (Some(Token::In), _) => CmpOp::In,
            (Some(Token::Not), Some(Token::In)) => {
                self.pos += 1;
                CmpOp::NotIn
            }
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    fn parse_comparison(&mut self) -> Result<Expr, GuardError> {
        let left = self.parse_primary()?;
        let Some(op) = self.comparison_operator() else {
            return Ok(left);
        };
        let right = self.parse_primary()?;
        if self.comparison_operator().is_some() {
            return Err(GuardError::Syntax(
                "chained comparisons are not supported".to_string(),
            ));
        }
        Ok(Expr::Compare(op, Box::new(left), Box::new(right)))
    }

    fn parse_primary(&mut self) -> Result<Expr, GuardError> {
        match self.advance() {
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::Str(s))),
            Some(Token::Int(i)) => Ok(Expr::Literal(Value::Int(i))),
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if !self.eat(&Token::LParen) {
                    return Ok(Expr::Name(name));
                }
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.parse_or()?);
                        if self.eat(&Token::Comma) {
                            continue;
                        }
                        self.expect(&Token::RParen)?;
                        break;
                    }
                }
                Ok(Expr::Call(name, args))
            }
            Some(token) => Err(GuardError::Syntax(format!("unexpected {token:?}"))),
            None => Err(GuardError::Syntax("unexpected end of expression".to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

fn eval(expr: &Expr, facts: &Facts) -> Result<Value, GuardError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Name(name) => facts
            .get(name)
            .cloned()
            .ok_or_else(|| GuardError::Name(name.clone())),
        Expr::Call(name, args) => {
            let values = args
                .iter()
                .map(|a| eval(a, facts))
                .collect::<Result<Vec<_>, _>>()?;
            call(name, values)
        }
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, facts)?.truthy())),
        Expr::And(left, right) => Ok(Value::Bool(
            eval(left, facts)?.truthy() && eval(right, facts)?.truthy(),
        )),
        Expr::Or(left, right) => Ok(Value::Bool(
            eval(left, facts)?.truthy() || eval(right, facts)?.truthy(),
        )),
        Expr::Compare(op, left, right) => {
            compare(*op, &eval(left, facts)?, &eval(right, facts)?).map(Value::Bool)
        }
    }
}

fn call(name: &str, args: Vec<Value>) -> Result<Value, GuardError> {
    match name {
        "d" => {
            let parts = args
                .into_iter()
                .map(|a| match a {
                    Value::Str(s) => Ok(s),
                    other => Err(GuardError::Type(format!(
                        "d() expects strings, got {}",
                        other.kind()
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Distribution(Distribution::new("", parts)))
        }
        "v" => match <[Value; 1]>::try_from(args) {
            Ok([Value::Str(s)]) => parse_version(&s).map(Value::Version),
            Ok([Value::Version(v)]) => Ok(Value::Version(v)),
            Ok([other]) => Err(GuardError::Type(format!(
                "v() expects a string, got {}",
                other.kind()
            ))),
            Err(args) => Err(GuardError::Type(format!(
                "v() takes exactly one argument ({} given)",
                args.len()
            ))),
        },
        other => Err(GuardError::Name(other.to_string())),
    }
}

fn parse_version(s: &str) -> Result<Version, GuardError> {
    s.parse()
        .map_err(|_| GuardError::Value(format!("invalid version '{s}'")))
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool, GuardError> {
    match op {
        CmpOp::Eq => Ok(equals(left, right)),
        CmpOp::Ne => Ok(!equals(left, right)),
        CmpOp::Lt => Ok(order(left, right)?.is_lt()),
        CmpOp::Le => Ok(order(left, right)?.is_le()),
        CmpOp::Gt => Ok(order(left, right)?.is_gt()),
        CmpOp::Ge => Ok(order(left, right)?.is_ge()),
        CmpOp::In => contains(right, left),
        CmpOp::NotIn => contains(right, left).map(|found| !found),
    }
}

fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Distribution(a), Value::Distribution(b)) => a.matches(b),
        (Value::Distribution(d), Value::Str(s)) | (Value::Str(s), Value::Distribution(d)) => {
            d.matches_str(s)
        }
        (Value::Version(a), Value::Version(b)) => a == b,
        (Value::Version(v), Value::Str(s)) | (Value::Str(s), Value::Version(v)) => {
            s.parse::<Version>().is_ok_and(|parsed| parsed == *v)
        }
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Bool(b), Value::Int(i)) | (Value::Int(i), Value::Bool(b)) => i64::from(*b) == *i,
        _ => false,
    }
}

fn order(left: &Value, right: &Value) -> Result<Ordering, GuardError> {
    match (left, right) {
        (Value::Version(a), Value::Version(b)) => Ok(a.cmp(b)),
        (Value::Version(a), Value::Str(s)) => Ok(a.cmp(&parse_version(s)?)),
        (Value::Str(s), Value::Version(b)) => Ok(parse_version(s)?.cmp(b)),
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => Err(GuardError::Type(format!(
            "'{}' and '{}' cannot be ordered",
            left.kind(),
            right.kind()
        ))),
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool, GuardError> {
    match (container, item) {
        (Value::Str(haystack), Value::Str(needle)) => Ok(haystack.contains(needle.as_str())),
        (Value::Distribution(d), Value::Str(part)) => Ok(d.contains(part)),
        _ => Err(GuardError::Type(format!(
            "'in' is not supported between '{}' and '{}'",
            item.kind(),
            container.kind()
        ))),
    }
}
