#![deny(unsafe_code)]

//! Numeric narrowing with overflow rejection.

use serde_json::Number;

fn parse_lenient(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Decimal text to a 32-bit signed integer, truncating toward zero.
/// Values outside the target width yield `None` rather than wrapping.
pub fn to_integer(raw: &str) -> Option<i64> {
    let value = parse_lenient(raw)?.trunc();
    if value < f64::from(i32::MIN) || value > f64::from(i32::MAX) {
        return None;
    }
    Some(value as i64)
}

/// Non-negative 32-bit integer.
pub fn to_unsigned_int(raw: &str) -> Option<i64> {
    to_integer(raw).filter(|v| *v >= 0)
}

/// Strictly positive 32-bit integer.
pub fn to_positive_int(raw: &str) -> Option<i64> {
    to_integer(raw).filter(|v| *v >= 1)
}

/// Decimal text to a JSON number. Integral values stay integral so the
/// serialized form is stable.
pub fn to_decimal(raw: &str) -> Option<Number> {
    let trimmed = raw.trim();
    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(Number::from(int));
    }
    let value = parse_lenient(trimmed)?;
    Number::from_f64(value)
}
