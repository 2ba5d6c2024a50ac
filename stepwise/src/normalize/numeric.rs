//! Decimal rendering of numeric parameter leaves.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Number, Value};

use crate::error::{Error, Result};

/// Rewrite every floating-point leaf under `value` as a plain decimal string.
///
/// Integers are left as they are. `path` is the pointer of `value` itself
/// and is extended while descending, so errors name the offending leaf.
///
/// # Errors
///
/// Returns [`Error::Normalization`] when a leaf's text is not a decimal
/// number.
pub fn render_decimals(value: &mut Value, path: &mut String) -> Result<()> {
    match value {
        Value::Number(number) => {
            if let Some(text) = render_number(number)
                .map_err(|reason| Error::normalization(path.clone(), reason))?
            {
                *value = Value::String(text);
            }
            Ok(())
        }
        Value::Array(items) => {
            for (index, item) in items.iter_mut().enumerate() {
                let len = path.len();
                path.push_str(&format!("/{index}"));
                render_decimals(item, path)?;
                path.truncate(len);
            }
            Ok(())
        }
        Value::Object(map) => {
            for (key, item) in map.iter_mut() {
                let len = path.len();
                push_segment(path, key);
                render_decimals(item, path)?;
                path.truncate(len);
            }
            Ok(())
        }
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
    }
}

/// Append `key` to a JSON pointer, escaping `~` and `/`.
pub(crate) fn push_segment(path: &mut String, key: &str) {
    path.push('/');
    path.push_str(&key.replace('~', "~0").replace('/', "~1"));
}

/// Plain decimal text for a float, `None` for an integer.
fn render_number(number: &Number) -> std::result::Result<Option<String>, String> {
    if number.is_i64() || number.is_u64() {
        return Ok(None);
    }
    let text = number.to_string();
    let decimal = if text.contains(['e', 'E']) {
        Decimal::from_scientific(&text)
    } else {
        Decimal::from_str(&text)
    };
    match decimal {
        Ok(decimal) => Ok(Some(plain(decimal))),
        // More than 28 fractional digits, or beyond the 96-bit mantissa.
        Err(_) => shift_point(&text).map(Some),
    }
}

/// Text without exponent, trailing zeros or a trailing decimal point.
#[must_use]
pub fn plain(decimal: Decimal) -> String {
    decimal.normalize().to_string()
}

/// Plain form of `[-]digits[.digits][e[+-]exp]` text, by moving the point.
///
/// Exact for any input: only the position of the point changes.
fn shift_point(text: &str) -> std::result::Result<String, String> {
    let malformed = || format!("{text} is not a decimal number");

    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => {
            (mantissa, exponent.parse::<i64>().map_err(|_| malformed())?)
        }
        None => (unsigned, 0),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if whole.is_empty() || !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }

    let digits = format!("{whole}{fraction}");
    let count = i64::try_from(digits.len()).map_err(|_| malformed())?;
    let point = i64::try_from(whole.len())
        .ok()
        .and_then(|len| len.checked_add(exponent))
        .ok_or_else(malformed)?;
    let zeros = |n: i64| usize::try_from(n).map(|n| "0".repeat(n)).map_err(|_| malformed());

    let (whole, fraction) = if point <= 0 {
        (String::new(), format!("{}{digits}", zeros(-point)?))
    } else if point >= count {
        (format!("{digits}{}", zeros(point - count)?), String::new())
    } else {
        let split = usize::try_from(point).map_err(|_| malformed())?;
        (digits[..split].to_string(), digits[split..].to_string())
    };

    let whole = match whole.trim_start_matches('0') {
        "" => "0",
        trimmed => trimmed,
    };
    let fraction = fraction.trim_end_matches('0');

    let mut out = String::new();
    if negative && (whole != "0" || !fraction.is_empty()) {
        out.push('-');
    }
    out.push_str(whole);
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    Ok(out)
}
