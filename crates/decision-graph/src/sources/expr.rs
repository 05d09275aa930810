//! Restricted arithmetic for compact numeric cells such as `2*150` or `(3 + 4) / 2`.
//!
//! Only number literals, `+ - * /`, unary signs and parentheses are accepted. `+ - *` on
//! integers stay integral (overflow is an error); `/` always yields a float.

use std::fmt;

/// Deepest parenthesis nesting accepted before the cell is left as text.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Integer(value) => value as f64,
            Number::Float(value) => value,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(value) => write!(f, "{value}"),
            Number::Float(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid expression at offset {position}: {message}")]
pub struct ExprError {
    pub position: usize,
    pub message: String,
}

/// Evaluate `text` as an arithmetic expression.
pub fn evaluate(text: &str) -> Result<Number, ExprError> {
    let mut parser = Parser {
        bytes: text.as_bytes(),
        pos: 0,
        depth: 0,
    };
    let value = parser.expression()?;
    parser.skip_whitespace();
    if parser.pos != parser.bytes.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    if let Number::Float(value) = value {
        if !value.is_finite() {
            return Err(ExprError {
                position: 0,
                message: "result is not a finite number".to_string(),
            });
        }
    }
    Ok(value)
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> ExprError {
        ExprError {
            position: self.pos,
            message: message.to_string(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.bytes.get(self.pos).copied()
    }

    fn expression(&mut self) -> Result<Number, ExprError> {
        let mut value = self.term()?;
        while let Some(op @ (b'+' | b'-')) = self.peek() {
            let at = self.pos;
            self.pos += 1;
            let rhs = self.term()?;
            value = apply(op, value, rhs).map_err(|message| ExprError {
                position: at,
                message,
            })?;
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<Number, ExprError> {
        let mut value = self.unary()?;
        while let Some(op @ (b'*' | b'/')) = self.peek() {
            let at = self.pos;
            self.pos += 1;
            let rhs = self.unary()?;
            value = apply(op, value, rhs).map_err(|message| ExprError {
                position: at,
                message,
            })?;
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<Number, ExprError> {
        let mut negate = false;
        while let Some(sign @ (b'-' | b'+')) = self.peek() {
            self.pos += 1;
            negate ^= sign == b'-';
        }
        let value = self.primary()?;
        if !negate {
            return Ok(value);
        }
        match value {
            Number::Integer(value) => value
                .checked_neg()
                .map(Number::Integer)
                .ok_or_else(|| self.error("integer overflow")),
            Number::Float(value) => Ok(Number::Float(-value)),
        }
    }

    fn primary(&mut self) -> Result<Number, ExprError> {
        match self.peek() {
            Some(b'(') => {
                if self.depth == MAX_DEPTH {
                    return Err(self.error("parentheses nested too deeply"));
                }
                self.pos += 1;
                self.depth += 1;
                let value = self.expression()?;
                self.depth -= 1;
                if self.peek() != Some(b')') {
                    return Err(self.error("expected ')'"));
                }
                self.pos += 1;
                Ok(value)
            }
            Some(byte) if byte.is_ascii_digit() || byte == b'.' => self.number(),
            Some(_) => Err(self.error("expected a number or '('")),
            None => Err(self.error("unexpected end of expression")),
        }
    }

    fn number(&mut self) -> Result<Number, ExprError> {
        let start = self.pos;
        let mut is_float = false;
        self.digits();
        if self.bytes.get(self.pos) == Some(&b'.') {
            is_float = true;
            self.pos += 1;
            self.digits();
        }
        if matches!(self.bytes.get(self.pos), Some(b'e' | b'E')) {
            is_float = true;
            self.pos += 1;
            if matches!(self.bytes.get(self.pos), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            self.digits();
        }

        let literal = std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| self.error("invalid number"))?;
        let invalid = || ExprError {
            position: start,
            message: format!("invalid number '{literal}'"),
        };

        if is_float {
            literal.parse::<f64>().map(Number::Float).map_err(|_| invalid())
        } else {
            literal.parse::<i64>().map(Number::Integer).map_err(|_| invalid())
        }
    }

    fn digits(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
    }
}

fn apply(op: u8, lhs: Number, rhs: Number) -> Result<Number, String> {
    if op == b'/' {
        let divisor = rhs.as_f64();
        if divisor == 0.0 {
            return Err("division by zero".to_string());
        }
        return Ok(Number::Float(lhs.as_f64() / divisor));
    }

    match (lhs, rhs) {
        (Number::Integer(a), Number::Integer(b)) => {
            let result = match op {
                b'+' => a.checked_add(b),
                b'-' => a.checked_sub(b),
                _ => a.checked_mul(b),
            };
            result
                .map(Number::Integer)
                .ok_or_else(|| "integer overflow".to_string())
        }
        (a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            Ok(Number::Float(match op {
                b'+' => a + b,
                b'-' => a - b,
                _ => a * b,
            }))
        }
    }
}
