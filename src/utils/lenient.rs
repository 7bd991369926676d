//! Tolerant deserializers for LLM-produced and loosely typed row JSON.
//!
//! Models routinely emit `null` for numbers they could not compute, quote
//! numbers as strings, or add currency symbols. These helpers coerce such
//! values instead of failing the whole document.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Reads a number from a JSON value: numbers as-is, numeric strings with
/// `£`, `$`, `,`, `%` or whitespace stripped, booleans as 0/1. `None` when the
/// value holds no number.
#[must_use]
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .chars()
            .filter(|c| !matches!(c, '£' | '$' | ',' | '%') && !c.is_whitespace())
            .collect::<String>()
            .parse()
            .ok(),
        Value::Bool(b) => Some(f64::from(u8::from(*b))),
        _ => None,
    }
}

/// [`parse_number`], with 0 for anything that is not a number.
#[must_use]
pub fn value_as_f64(value: &Value) -> f64 {
    parse_number(value).unwrap_or(0.0)
}

/// Renders a JSON value as prompt text; strings are unquoted, `null` is empty.
#[must_use]
pub fn value_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_f64(&value))
}

/// Missing, blank and non-numeric values (`"n/a"`, `"varies"`) become `None`.
pub fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(parse_number(&value))
}

pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_string(&value))
}

/// Accepts a list of strings, a single string, or `null`.
pub fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .iter()
            .map(value_as_string)
            .filter(|s| !s.is_empty())
            .collect(),
        Value::Null => Vec::new(),
        other => {
            let s = value_as_string(&other);
            if s.is_empty() { Vec::new() } else { vec![s] }
        }
    })
}

/// Treats `null` as the type's default.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
