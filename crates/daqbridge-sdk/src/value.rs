//! Dynamically typed property values and the literal evaluator used when a
//! caller sets a property from text.

use std::fmt;

use daqbridge_types::{DaqError, DaqResult};
use serde::{Deserialize, Serialize};

/// Static type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoreType {
    Bool,
    Int,
    Float,
    String,
    List,
    Ratio,
}

impl fmt::Display for CoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoreType::Bool => "Bool",
            CoreType::Int => "Int",
            CoreType::Float => "Float",
            CoreType::String => "String",
            CoreType::List => "List",
            CoreType::Ratio => "Ratio",
        };
        f.write_str(name)
    }
}

/// A rational number, used for tick resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratio {
    pub num: i64,
    pub den: i64,
}

impl Ratio {
    pub fn new(num: i64, den: i64) -> Self {
        Self { num, den }
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// A property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Ratio(Ratio),
}

impl Value {
    pub fn core_type(&self) -> CoreType {
        match self {
            Value::Bool(_) => CoreType::Bool,
            Value::Int(_) => CoreType::Int,
            Value::Float(_) => CoreType::Float,
            Value::String(_) => CoreType::String,
            Value::List(_) => CoreType::List,
            Value::Ratio(_) => CoreType::Ratio,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Value::Bool(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::Int(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert `self` into a value of type `target`.
    ///
    /// # Errors
    ///
    /// Returns [`DaqError::Generic`] when no lossless conversion exists, for
    /// instance a non-integral float into an `Int` property.
    pub fn coerce(self, target: CoreType) -> DaqResult<Value> {
        if self.core_type() == target {
            return Ok(self);
        }
        let converted = match (&self, target) {
            (Value::Int(v), CoreType::Float) => Some(Value::Float(*v as f64)),
            (Value::Float(v), CoreType::Int) if v.fract() == 0.0 => Some(Value::Int(*v as i64)),
            (Value::Int(v), CoreType::Bool) if *v == 0 || *v == 1 => Some(Value::Bool(*v == 1)),
            (Value::Bool(v), CoreType::Int) => Some(Value::Int(i64::from(*v))),
            (Value::Int(v), CoreType::String) => Some(Value::String(v.to_string())),
            (Value::Float(v), CoreType::String) => Some(Value::String(v.to_string())),
            (Value::Bool(v), CoreType::String) => Some(Value::String(v.to_string())),
            (_, CoreType::List) => Some(Value::List(vec![self.clone()])),
            _ => None,
        };
        converted.ok_or_else(|| {
            DaqError::generic(format!("Cannot convert {} value '{}' to {}.", self.core_type(), self, target))
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
            Value::Ratio(r) => write!(f, "{r}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

/// Evaluate a textual literal into a [`Value`].
///
/// Understands `true`/`false`, integers, floats, `num/den` ratios, quoted
/// strings, flat `[a, b, c]` lists and bare words (taken as strings).
///
/// # Errors
///
/// Returns [`DaqError::Generic`] for empty input, unbalanced quotes or
/// brackets, and non-finite numbers.
pub fn eval_value(text: &str) -> DaqResult<Value> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DaqError::generic("Cannot evaluate an empty value."));
    }

    match text {
        "true" | "True" => return Ok(Value::Bool(true)),
        "false" | "False" => return Ok(Value::Bool(false)),
        _ => {}
    }

    if let Ok(v) = text.parse::<i64>() {
        return Ok(Value::Int(v));
    }
    if looks_numeric(text) {
        let v = text
            .parse::<f64>()
            .map_err(|e| DaqError::generic(format!("Cannot evaluate '{text}': {e}")))?;
        if !v.is_finite() {
            return Err(DaqError::generic(format!("Cannot evaluate '{text}': not finite")));
        }
        return Ok(Value::Float(v));
    }

    if let Some((num, den)) = text.split_once('/')
        && let (Ok(num), Ok(den)) = (num.trim().parse::<i64>(), den.trim().parse::<i64>())
    {
        if den == 0 {
            return Err(DaqError::generic("Ratio denominator must not be zero."));
        }
        return Ok(Value::Ratio(Ratio::new(num, den)));
    }

    for quote in ['"', '\''] {
        if text.starts_with(quote) {
            return match text[1..].strip_suffix(quote) {
                Some(inner) => Ok(Value::String(inner.to_string())),
                None => Err(DaqError::generic(format!("Unterminated string '{text}'."))),
            };
        }
    }

    if let Some(rest) = text.strip_prefix('[') {
        let inner = rest
            .strip_suffix(']')
            .ok_or_else(|| DaqError::generic(format!("Unterminated list '{text}'.")))?;
        if inner.trim().is_empty() {
            return Ok(Value::List(Vec::new()));
        }
        let items = inner.split(',').map(eval_value).collect::<DaqResult<Vec<_>>>()?;
        return Ok(Value::List(items));
    }
    if text.contains(['[', ']']) {
        return Err(DaqError::generic(format!("Cannot evaluate '{text}'.")));
    }

    Ok(Value::String(text.to_string()))
}

fn looks_numeric(text: &str) -> bool {
    let body = text.strip_prefix(['-', '+']).unwrap_or(text);
    body.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '.')
        && body.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_scalars() {
        assert_eq!(eval_value("true").unwrap(), Value::Bool(true));
        assert_eq!(eval_value(" 42 ").unwrap(), Value::Int(42));
        assert_eq!(eval_value("-2.5").unwrap(), Value::Float(-2.5));
        assert_eq!(eval_value("1e3").unwrap(), Value::Float(1000.0));
        assert_eq!(eval_value("1/1000").unwrap(), Value::Ratio(Ratio::new(1, 1000)));
    }

    #[test]
    fn evaluates_strings_and_lists() {
        assert_eq!(eval_value("'hello world'").unwrap(), Value::from("hello world"));
        assert_eq!(eval_value("bare").unwrap(), Value::from("bare"));
        assert_eq!(
            eval_value("[1, 2.5, x]").unwrap(),
            Value::List(vec![Value::Int(1), Value::Float(2.5), Value::from("x")])
        );
        assert_eq!(eval_value("[]").unwrap(), Value::List(vec![]));
    }

    #[test]
    fn rejects_malformed_literals() {
        assert!(eval_value("").is_err());
        assert!(eval_value("'open").is_err());
        assert!(eval_value("[1, 2").is_err());
        assert!(eval_value("1.2.3").is_err());
        assert!(eval_value("3/0").is_err());
    }

    #[test]
    fn coerces_between_numeric_types() {
        assert_eq!(Value::Int(3).coerce(CoreType::Float).unwrap(), Value::Float(3.0));
        assert_eq!(Value::Float(4.0).coerce(CoreType::Int).unwrap(), Value::Int(4));
        assert!(Value::Float(4.5).coerce(CoreType::Int).is_err());
        assert!(Value::from("abc").coerce(CoreType::Int).is_err());
    }

    #[test]
    fn display_formats_lists() {
        let v = Value::List(vec![Value::Int(1), Value::from("a")]);
        assert_eq!(v.to_string(), "[1, a]");
        assert_eq!(Value::Float(5.0).to_string(), "5");
    }
}
