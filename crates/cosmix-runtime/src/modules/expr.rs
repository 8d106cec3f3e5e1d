//! Arithmetic expressions over named parameters.
//!
//! Grammar:
//!
//! ```text
//! relation := ident '=' expr
//! expr     := term (('+' | '-') term)*
//! term     := unary (('*' | '/') unary)*
//! unary    := '-' unary | power
//! power    := atom ('^' unary)?
//! atom     := number | ident | ident '(' expr ')' | '(' expr ')'
//! ```
//!
//! Functions: `sqrt`, `exp`, `log`, `log10`, `abs`.

use thiserror::Error;

/// Expression parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at position {position} in '{source_text}'")]
pub struct ExprError {
    pub position: usize,
    pub message: String,
    pub source_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Sqrt,
    Exp,
    Log,
    Log10,
    Abs,
}

impl Func {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "sqrt" => Some(Self::Sqrt),
            "exp" => Some(Self::Exp),
            "log" | "ln" => Some(Self::Log),
            "log10" => Some(Self::Log10),
            "abs" => Some(Self::Abs),
            _ => None,
        }
    }

    fn apply(self, x: f64) -> f64 {
        match self {
            Self::Sqrt => x.sqrt(),
            Self::Exp => x.exp(),
            Self::Log => x.ln(),
            Self::Log10 => x.log10(),
            Self::Abs => x.abs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Var(String),
    Neg(Box<Expr>),
    Bin(BinOp, Box<Expr>, Box<Expr>),
    Call(Func, Box<Expr>),
}

impl Expr {
    /// Evaluates with `lookup` for variables; `None` if any is unknown.
    pub fn eval(&self, lookup: &impl Fn(&str) -> Option<f64>) -> Option<f64> {
        Some(match self {
            Self::Num(x) => *x,
            Self::Var(name) => lookup(name)?,
            Self::Neg(e) => -e.eval(lookup)?,
            Self::Call(f, e) => f.apply(e.eval(lookup)?),
            Self::Bin(op, a, b) => {
                let (a, b) = (a.eval(lookup)?, b.eval(lookup)?);
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                    BinOp::Pow => a.powf(b),
                }
            }
        })
    }

    /// Variable names, in order of first appearance.
    #[must_use]
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Num(_) => {}
            Self::Var(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Self::Neg(e) | Self::Call(_, e) => e.collect_vars(out),
            Self::Bin(_, a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
        }
    }
}

impl std::str::FromStr for Expr {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser::new(s)?;
        let expr = parser.expr()?;
        parser.finish()?;
        Ok(expr)
    }
}

/// `target = expr`.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub target: String,
    pub expr: Expr,
}

impl std::str::FromStr for Relation {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser::new(s)?;
        let target = match parser.next() {
            Some((_, Token::Ident(name))) => name,
            other => return Err(parser.error_at(other.map(|(p, _)| p), "expected a parameter name")),
        };
        match parser.next() {
            Some((_, Token::Eq)) => {}
            other => return Err(parser.error_at(other.map(|(p, _)| p), "expected '='")),
        }
        let expr = parser.expr()?;
        parser.finish()?;
        Ok(Self { target, expr })
    }
}

/// Parses a comma-separated relation list; blank entries are skipped.
///
/// # Errors
///
/// The first [`ExprError`].
pub fn parse_relations(text: &str) -> Result<Vec<Relation>, ExprError> {
    text.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::parse)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
    Eq,
}

struct Parser {
    source: String,
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(source)?;
        Ok(Self {
            source: source.to_string(),
            tokens,
            pos: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn next(&mut self) -> Option<(usize, Token)> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn error_at(&self, position: Option<usize>, message: &str) -> ExprError {
        ExprError {
            position: position.unwrap_or(self.source.len()),
            message: message.to_string(),
            source_text: self.source.clone(),
        }
    }

    fn finish(&mut self) -> Result<(), ExprError> {
        match self.next() {
            None => Ok(()),
            Some((p, _)) => Err(self.error_at(Some(p), "unexpected trailing input")),
        }
    }

    fn expr(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(c @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let op = if c == '+' { BinOp::Add } else { BinOp::Sub };
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(self.term()?));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(c @ ('*' | '/'))) = self.peek().cloned() {
            self.pos += 1;
            let op = if c == '*' { BinOp::Mul } else { BinOp::Div };
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(self.unary()?));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if let Some(Token::Op('-')) = self.peek() {
            self.pos += 1;
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, ExprError> {
        let base = self.atom()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(Expr::Bin(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, ExprError> {
        match self.next() {
            Some((_, Token::Num(x))) => Ok(Expr::Num(x)),
            Some((p, Token::Ident(name))) => {
                if let Some(Token::LParen) = self.peek() {
                    let func = Func::from_name(&name)
                        .ok_or_else(|| self.error_at(Some(p), "unknown function"))?;
                    self.pos += 1;
                    let arg = self.expr()?;
                    self.expect_rparen()?;
                    Ok(Expr::Call(func, Box::new(arg)))
                } else {
                    Ok(Expr::Var(name))
                }
            }
            Some((_, Token::LParen)) => {
                let inner = self.expr()?;
                self.expect_rparen()?;
                Ok(inner)
            }
            other => Err(self.error_at(other.map(|(p, _)| p), "expected a number, name or '('")),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), ExprError> {
        match self.next() {
            Some((_, Token::RParen)) => Ok(()),
            other => Err(self.error_at(other.map(|(p, _)| p), "expected ')'")),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, ExprError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    let error = |position: usize, message: &str| ExprError {
        position,
        message: message.to_string(),
        source_text: source.to_string(),
    };

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' => i += 1,
            '+' | '-' | '*' | '/' | '^' => {
                tokens.push((i, Token::Op(c)));
                i += 1;
            }
            '(' => {
                tokens.push((i, Token::LParen));
                i += 1;
            }
            ')' => {
                tokens.push((i, Token::RParen));
                i += 1;
            }
            '=' => {
                tokens.push((i, Token::Eq));
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                    let mut j = i + 1;
                    if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                        j += 1;
                    }
                    if j < bytes.len() && bytes[j].is_ascii_digit() {
                        i = j;
                        while i < bytes.len() && bytes[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let value = source[start..i]
                    .parse()
                    .map_err(|_| error(start, "malformed number"))?;
                tokens.push((start, Token::Num(value)));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                tokens.push((start, Token::Ident(source[start..i].to_ascii_lowercase())));
            }
            _ => return Err(error(i, "unexpected character")),
        }
    }
    Ok(tokens)
}
