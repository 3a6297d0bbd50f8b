//! Restricted expression evaluator.
//!
//! A small recursive-descent parser over numeric literals, quoted string
//! literals, and a fixed operator set (`+ - * /` and the six comparisons).
//! Substituted metric values are data, never code: there are no
//! identifiers, no calls, and no way to reach outside the grammar.

use std::cmp::Ordering;

use crate::error::EvalError;

/// Result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(f64),
    Str(String),
    Bool(bool),
}

impl Value {
    /// Ordering between two values; mixed types are incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Num(a), Value::Num(b)) => a.partial_cmp(b),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Num(v) if v.fract() == 0.0 && v.is_finite() => write!(f, "{v:.0}"),
            Value::Num(v) => write!(f, "{v}"),
            Value::Str(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(f64),
    Str(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

fn lex(expr: &str) -> Result<Vec<Tok>, EvalError> {
    let mut toks = Vec::new();
    let mut chars = expr.char_indices().peekable();
    while let Some(&(i, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut end = i;
                while let Some(&(j, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        end = j + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let num = expr[i..end]
                    .parse::<f64>()
                    .map_err(|_| EvalError::BadSyntax(format!("bad number in '{expr}'")))?;
                toks.push(Tok::Num(num));
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut s = String::new();
                let mut closed = false;
                for (_, d) in chars.by_ref() {
                    if d == quote {
                        closed = true;
                        break;
                    }
                    s.push(d);
                }
                if !closed {
                    return Err(EvalError::BadSyntax(format!(
                        "unterminated string in '{expr}'"
                    )));
                }
                toks.push(Tok::Str(s));
            }
            '+' => {
                chars.next();
                toks.push(Tok::Plus);
            }
            '-' => {
                chars.next();
                toks.push(Tok::Minus);
            }
            '*' => {
                chars.next();
                toks.push(Tok::Star);
            }
            '/' => {
                chars.next();
                toks.push(Tok::Slash);
            }
            '(' => {
                chars.next();
                toks.push(Tok::LParen);
            }
            ')' => {
                chars.next();
                toks.push(Tok::RParen);
            }
            '=' | '!' | '<' | '>' => {
                chars.next();
                let followed_by_eq = matches!(chars.peek(), Some(&(_, '=')));
                if followed_by_eq {
                    chars.next();
                }
                let tok = match (c, followed_by_eq) {
                    ('=', true) => Tok::Eq,
                    ('!', true) => Tok::Ne,
                    ('<', true) => Tok::Le,
                    ('<', false) => Tok::Lt,
                    ('>', true) => Tok::Ge,
                    ('>', false) => Tok::Gt,
                    _ => {
                        return Err(EvalError::BadSyntax(format!(
                            "unexpected '{c}' in '{expr}'"
                        )))
                    }
                };
                toks.push(tok);
            }
            other => {
                return Err(EvalError::BadSyntax(format!(
                    "unexpected character '{other}' in '{expr}'"
                )));
            }
        }
    }
    Ok(toks)
}

struct Parser<'a> {
    toks: &'a [Tok],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Tok> {
        self.toks.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Tok> {
        let tok = self.toks.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn comparison(&mut self) -> Result<Value, EvalError> {
        let left = self.additive()?;
        let op = match self.peek() {
            Some(Tok::Eq | Tok::Ne | Tok::Lt | Tok::Le | Tok::Gt | Tok::Ge) => {
                self.next().expect("peeked")
            }
            _ => return Ok(left),
        };
        let right = self.additive()?;
        compare(op, &left, &right).map(Value::Bool)
    }

    fn additive(&mut self) -> Result<Value, EvalError> {
        let mut acc = self.term()?;
        while let Some(op @ (Tok::Plus | Tok::Minus)) = self.peek() {
            self.next();
            let rhs = self.term()?;
            let (Value::Num(a), Value::Num(b)) = (&acc, &rhs) else {
                return Err(EvalError::BadSyntax(
                    "arithmetic on non-numeric operand".to_string(),
                ));
            };
            acc = Value::Num(if *op == Tok::Plus { a + b } else { a - b });
        }
        Ok(acc)
    }

    fn term(&mut self) -> Result<Value, EvalError> {
        let mut acc = self.factor()?;
        while let Some(op @ (Tok::Star | Tok::Slash)) = self.peek() {
            self.next();
            let rhs = self.factor()?;
            let (Value::Num(a), Value::Num(b)) = (&acc, &rhs) else {
                return Err(EvalError::BadSyntax(
                    "arithmetic on non-numeric operand".to_string(),
                ));
            };
            acc = if *op == Tok::Star {
                Value::Num(a * b)
            } else {
                if *b == 0.0 {
                    return Err(EvalError::DivideByZero);
                }
                Value::Num(a / b)
            };
        }
        Ok(acc)
    }

    fn factor(&mut self) -> Result<Value, EvalError> {
        match self.next() {
            Some(Tok::Num(n)) => Ok(Value::Num(*n)),
            Some(Tok::Str(s)) => Ok(Value::Str(s.clone())),
            Some(Tok::Minus) => match self.factor()? {
                Value::Num(n) => Ok(Value::Num(-n)),
                _ => Err(EvalError::BadSyntax(
                    "unary minus on non-numeric operand".to_string(),
                )),
            },
            Some(Tok::LParen) => {
                let inner = self.comparison()?;
                match self.next() {
                    Some(Tok::RParen) => Ok(inner),
                    _ => Err(EvalError::BadSyntax("missing closing paren".to_string())),
                }
            }
            other => Err(EvalError::BadSyntax(format!(
                "unexpected token: {other:?}"
            ))),
        }
    }
}

fn compare(op: &Tok, left: &Value, right: &Value) -> Result<bool, EvalError> {
    match left.compare(right) {
        Some(ord) => Ok(match op {
            Tok::Eq => ord == Ordering::Equal,
            Tok::Ne => ord != Ordering::Equal,
            Tok::Lt => ord == Ordering::Less,
            Tok::Le => ord != Ordering::Greater,
            Tok::Gt => ord == Ordering::Greater,
            Tok::Ge => ord != Ordering::Less,
            _ => unreachable!("comparison token"),
        }),
        // Mixed types: only (in)equality is defined.
        None => match op {
            Tok::Eq => Ok(false),
            Tok::Ne => Ok(true),
            _ => Err(EvalError::BadSyntax(
                "ordering comparison between mixed types".to_string(),
            )),
        },
    }
}

/// Evaluate a fully substituted expression.
pub fn evaluate(expr: &str) -> Result<Value, EvalError> {
    let toks = lex(expr)?;
    let mut parser = Parser {
        toks: &toks,
        pos: 0,
    };
    let value = parser.comparison()?;
    if parser.pos != toks.len() {
        return Err(EvalError::BadSyntax(format!(
            "trailing tokens in '{expr}'"
        )));
    }
    Ok(value)
}
