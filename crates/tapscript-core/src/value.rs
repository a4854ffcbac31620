//! Script variable values.
//!
//! A value keeps the exact text it was written with. Only canonical
//! integers (`5`, `-12`, not `05` or `+5`) are stored as numbers, so text
//! comparisons never see a rewritten token.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A script variable value.
///
/// Scripts are untyped: every value can be read as text, and as a number
/// through [`as_number`](Value::as_number), which maps anything non-numeric
/// to `0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(i64),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Number(n) => write!(f, "{}", n),
        }
    }
}

impl Value {
    /// Reads a script token. Integers written in canonical form become
    /// `Number`; everything else, including `007` and `+5`, stays `Text`.
    pub fn from_literal(token: &str) -> Self {
        let trimmed = token.trim();
        match trimmed.parse::<i64>() {
            Ok(n) if n.to_string() == trimmed => Value::Number(n),
            _ => Value::Text(token.to_string()),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) => n.to_string(),
        }
    }

    pub fn as_number(&self) -> i64 {
        match self {
            Value::Number(n) => *n,
            Value::Text(s) => s.trim().parse().unwrap_or(0),
        }
    }

    /// `"true"` and `"1"` are truthy, nothing else is.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n == 1,
            Value::Text(s) => s == "true" || s == "1",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            _ => self.as_text() == other.as_text(),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}
