//! Scalar descriptions: any, boolean, number, string and choice.

use super::{ConfigDescription, Fallback, Input, ParseResult, ParserContext, settle};
use crate::error::Expected;
use regex_lite::Regex;
use serde_json::{Number, Value};
use std::sync::LazyLock;

static FALSE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:f(?:alse)?|n(?:o)?|0)$").expect("valid false pattern")
});
static TRUE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:t(?:rue)?|y(?:es)?|1)$").expect("valid true pattern")
});

/// Validation and coercion of a single scalar value.
pub trait LeafKind: Send + Sync {
    fn coerce(&self, value: &Value) -> Result<Value, Expected>;
}

/// A scalar description with an optional default value.
pub struct LeafDescription<K> {
    kind: K,
    default: Option<Value>,
}

impl<K: LeafKind> LeafDescription<K> {
    pub fn new(kind: K, default: Option<Value>) -> Self {
        Self { kind, default }
    }
}

impl<K: LeafKind> ConfigDescription for LeafDescription<K> {
    fn parse(&self, data: Option<&Value>, context: &ParserContext) -> ParseResult {
        let fallback = match &self.default {
            Some(value) => Fallback::Value(value),
            None => Fallback::Mandatory,
        };
        match settle(data, context, fallback) {
            Input::Present(value) => {
                let coerced = self
                    .kind
                    .coerce(value)
                    .map_err(|expected| context.expected(expected))?;
                Ok(Some(context.direct(coerced)))
            }
            Input::Settled(result) => result,
        }
    }
}

pub struct AnyKind;

impl LeafKind for AnyKind {
    fn coerce(&self, value: &Value) -> Result<Value, Expected> {
        Ok(value.clone())
    }
}

pub struct BooleanKind;

impl LeafKind for BooleanKind {
    fn coerce(&self, value: &Value) -> Result<Value, Expected> {
        parse_boolean(value)
            .map(Value::Bool)
            .ok_or(Expected::Boolean)
    }
}

/// Interpret a value as a boolean: booleans, 0/1, and strings such as
/// `yes`, `n`, `TRUE` or `0`.
pub fn parse_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => match number.as_f64() {
            Some(n) if n == 0.0 => Some(false),
            Some(n) if n == 1.0 => Some(true),
            _ => None,
        },
        Value::String(text) => {
            if FALSE_PATTERN.is_match(text) {
                Some(false)
            } else if TRUE_PATTERN.is_match(text) {
                Some(true)
            } else {
                None
            }
        }
        _ => None,
    }
}

pub struct NumberKind;

impl LeafKind for NumberKind {
    fn coerce(&self, value: &Value) -> Result<Value, Expected> {
        match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(text) => parse_number(text).ok_or(Expected::Number),
            _ => Err(Expected::Number),
        }
    }
}

fn parse_number(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let number: f64 = trimmed.parse().ok()?;
    number.is_finite().then(|| number_value(number))
}

/// Convert a float into a JSON number, integral values as integers.
pub(crate) fn number_value(number: f64) -> Value {
    if number.fract() == 0.0 && number.abs() < 9_007_199_254_740_992.0 {
        Value::from(number as i64)
    } else {
        Number::from_f64(number).map_or(Value::Null, Value::Number)
    }
}

pub struct StringKind;

impl LeafKind for StringKind {
    fn coerce(&self, value: &Value) -> Result<Value, Expected> {
        match value {
            Value::String(_) => Ok(value.clone()),
            Value::Bool(_) | Value::Number(_) => Ok(Value::String(scalar_to_string(value))),
            _ => Err(Expected::String),
        }
    }
}

/// Render a boolean or a number the way it is usually written in a file.
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Number(number) => match (number.as_i64(), number.as_u64(), number.as_f64()) {
            (Some(n), _, _) => n.to_string(),
            (_, Some(n), _) => n.to_string(),
            (_, _, Some(n)) => format!("{n}"),
            _ => number.to_string(),
        },
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// A value among a fixed set of strings or numbers.
pub struct ChoiceKind {
    choices: Vec<Value>,
}

impl ChoiceKind {
    pub fn new(choices: Vec<Value>) -> Self {
        Self { choices }
    }

    fn find(&self, candidate: &Value) -> Option<Value> {
        self.choices
            .iter()
            .find(|choice| same_value(choice, candidate))
            .cloned()
    }
}

impl LeafKind for ChoiceKind {
    fn coerce(&self, value: &Value) -> Result<Value, Expected> {
        if let Some(choice) = self.find(value) {
            return Ok(choice);
        }
        let coerced = match value {
            Value::Bool(_) | Value::Number(_) => Some(Value::String(scalar_to_string(value))),
            Value::String(text) => parse_number(text),
            _ => None,
        };
        coerced
            .and_then(|candidate| self.find(&candidate))
            .ok_or_else(|| Expected::Choice(self.choices.iter().map(scalar_to_string).collect()))
    }
}

fn same_value(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.as_f64() == r.as_f64(),
        _ => left == right,
    }
}
