//! Typed coercion of loosely-typed document values.
//!
//! Content authors store the same logical field as a number, a numeric
//! string, a fraction, or a `{ "value": ... }` wrapper depending on system
//! version and taste. Each [`Coerce`] implementation accepts all of these and
//! returns `None` for anything it can't make sense of, which lets
//! [`Document::first`](crate::Document::first) move on to the next path.

use crate::consts::{FRACTION_REGEX, LEADING_NUMBER_REGEX};
use serde_json::Value;

pub trait Coerce: Sized {
    fn coerce(value: &Value) -> Option<Self>;
}

/// Unwrap `{ "value": x }` wrappers, which every system uses somewhere.
fn unwrap_value(value: &Value) -> &Value {
    match value {
        Value::Object(map) => map.get("value").map(unwrap_value).unwrap_or(value),
        _ => value,
    }
}

/// Parse a numeric string, including fractions (`"1/4"` is `0.25`) and
/// free text with a leading number (`"3 (700 XP)"` is `3.0`).
///
/// # Examples
///
/// ```
/// use bestiary_extract::parse_number;
/// assert_eq!(parse_number("1/8"), Some(0.125));
/// assert_eq!(parse_number(" 12 "), Some(12.0));
/// assert_eq!(parse_number("-1"), Some(-1.0));
/// assert_eq!(parse_number("1/0"), None);
/// assert_eq!(parse_number("tough"), None);
/// ```
pub fn parse_number(s: &str) -> Option<f64> {
    if let Some(captures) = FRACTION_REGEX.captures(s) {
        let numerator = captures.get(1)?.as_str().parse::<f64>().ok()?;
        let denominator = captures.get(2)?.as_str().parse::<f64>().ok()?;
        return (denominator != 0.0).then(|| numerator / denominator).filter(|n| n.is_finite());
    }
    LEADING_NUMBER_REGEX.captures(s)?.get(1)?.as_str().parse::<f64>().ok().filter(|n| n.is_finite())
}

impl Coerce for f64 {
    fn coerce(value: &Value) -> Option<Self> {
        match unwrap_value(value) {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_number(s),
            _ => None,
        }
    }
}

impl Coerce for i32 {
    fn coerce(value: &Value) -> Option<Self> {
        let n = f64::coerce(value)?.trunc();
        (n >= f64::from(i32::MIN) && n <= f64::from(i32::MAX)).then_some(n as i32)
    }
}

impl Coerce for u32 {
    fn coerce(value: &Value) -> Option<Self> {
        let n = f64::coerce(value)?.round();
        (n >= 0.0 && n <= f64::from(u32::MAX)).then_some(n as u32)
    }
}

impl Coerce for bool {
    fn coerce(value: &Value) -> Option<Self> {
        match unwrap_value(value) {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|n| n != 0.0),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Trimmed, non-empty text. Numbers are rendered, everything else is `None`.
impl Coerce for String {
    fn coerce(value: &Value) -> Option<Self> {
        match unwrap_value(value) {
            Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// A list of labels. Accepts arrays of strings or of `{value}`/`{name}`
/// objects, a comma/semicolon separated string, or a Foundry "set" stored as
/// an object of `label: true` flags.
impl Coerce for Vec<String> {
    fn coerce(value: &Value) -> Option<Self> {
        let labels: Vec<String> = match unwrap_value(value) {
            Value::Array(list) => list
                .iter()
                .filter_map(|item| match item {
                    Value::Object(map) => map.get("name").and_then(String::coerce).or_else(|| String::coerce(item)),
                    other => String::coerce(other),
                })
                .collect(),
            Value::String(s) => s.split([',', ';']).map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect(),
            Value::Object(map) => map
                .iter()
                .filter(|(_, flag)| bool::coerce(flag).unwrap_or(false))
                .map(|(label, _)| label.clone())
                .collect(),
            _ => return None,
        };
        Some(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!(5), Some(5.0))]
    #[case(json!(0.5), Some(0.5))]
    #[case(json!("1/4"), Some(0.25))]
    #[case(json!("1/2"), Some(0.5))]
    #[case(json!(" 17 "), Some(17.0))]
    #[case(json!("3 (700 XP)"), Some(3.0))]
    #[case(json!({ "value": "1/8" }), Some(0.125))]
    #[case(json!({ "value": { "value": 2 } }), Some(2.0))]
    #[case(json!("—"), None)]
    #[case(json!(format!("{}/2", "9".repeat(400))), None)]
    #[case(json!(format!("{0}/{0}", "9".repeat(400))), None)]
    #[case(json!("9".repeat(400)), None)]
    #[case(json!(null), None)]
    #[case(json!(true), None)]
    fn test_f64(#[case] input: Value, #[case] expected: Option<f64>) {
        assert_eq!(f64::coerce(&input), expected);
    }

    #[rstest]
    #[case(json!(-1), Some(-1))]
    #[case(json!("-1"), Some(-1))]
    #[case(json!(3.9), Some(3))]
    #[case(json!({ "value": 12 }), Some(12))]
    #[case(json!("high"), None)]
    fn test_i32(#[case] input: Value, #[case] expected: Option<i32>) {
        assert_eq!(i32::coerce(&input), expected);
    }

    #[rstest]
    #[case(json!(22), Some(22))]
    #[case(json!("15"), Some(15))]
    #[case(json!(-4), None)]
    fn test_u32(#[case] input: Value, #[case] expected: Option<u32>) {
        assert_eq!(u32::coerce(&input), expected);
    }

    #[rstest]
    #[case(json!(true), Some(true))]
    #[case(json!(0), Some(false))]
    #[case(json!("yes"), Some(true))]
    #[case(json!({ "value": false }), Some(false))]
    #[case(json!("maybe"), None)]
    fn test_bool(#[case] input: Value, #[case] expected: Option<bool>) {
        assert_eq!(bool::coerce(&input), expected);
    }

    #[rstest]
    #[case(json!(" Humanoid "), Some("Humanoid"))]
    #[case(json!({ "value": "undead" }), Some("undead"))]
    #[case(json!(""), None)]
    #[case(json!(4), Some("4"))]
    #[case(json!([]), None)]
    fn test_string(#[case] input: Value, #[case] expected: Option<&str>) {
        assert_eq!(String::coerce(&input).as_deref(), expected);
    }

    #[rstest]
    #[case(json!(["fire", " undead "]), vec!["fire", "undead"])]
    #[case(json!([{ "name": "Solo" }, { "value": "Netrunner" }]), vec!["Solo", "Netrunner"])]
    #[case(json!("goblin, humanoid;; small"), vec!["goblin", "humanoid", "small"])]
    #[case(json!({ "value": ["elf"] }), vec!["elf"])]
    #[case(json!({ "fire": true, "cold": false }), vec!["fire"])]
    fn test_labels(#[case] input: Value, #[case] expected: Vec<&str>) {
        assert_eq!(Vec::<String>::coerce(&input).unwrap(), expected);
    }

    #[test]
    fn test_labels_reject_scalars() {
        assert_eq!(Vec::<String>::coerce(&json!(3)), None);
    }
}
