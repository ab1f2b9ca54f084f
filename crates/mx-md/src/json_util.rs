//! Shared JSON parsing helpers used by every stream decoder.
//!
//! Exchange payloads encode numbers either as JSON strings (`"30000.5"`) or
//! native numbers (`30000.5`); the helpers accept both. The `*_field`
//! variants turn a missing or malformed field into a [`DecodeError`] naming
//! the field.

use mx_core::DecodeError;
use serde_json::Value;

/// Parse a JSON value (string or number) as `f64`.
#[inline]
pub fn parse_str_f64(v: Option<&Value>) -> Option<f64> {
    let v = v?;
    if let Some(s) = v.as_str() {
        fast_float2::parse(s).ok()
    } else {
        v.as_f64()
    }
}

/// Parse a JSON value (string or number) as `u64`.
#[inline]
pub fn parse_str_u64(v: Option<&Value>) -> Option<u64> {
    let v = v?;
    if let Some(s) = v.as_str() {
        s.parse().ok()
    } else {
        v.as_u64()
    }
}

/// Parse a JSON value (string or number) as `i64`.
#[inline]
pub fn parse_str_i64(v: Option<&Value>) -> Option<i64> {
    let v = v?;
    if let Some(s) = v.as_str() {
        s.parse().ok()
    } else {
        v.as_i64()
    }
}

#[inline]
pub fn f64_field(v: &Value, key: &str) -> Result<f64, DecodeError> {
    parse_str_f64(v.get(key)).ok_or_else(|| DecodeError::missing(key))
}

#[inline]
pub fn u64_field(v: &Value, key: &str) -> Result<u64, DecodeError> {
    parse_str_u64(v.get(key)).ok_or_else(|| DecodeError::missing(key))
}

#[inline]
pub fn i64_field(v: &Value, key: &str) -> Result<i64, DecodeError> {
    parse_str_i64(v.get(key)).ok_or_else(|| DecodeError::missing(key))
}

#[inline]
pub fn str_field<'a>(v: &'a Value, key: &str) -> Result<&'a str, DecodeError> {
    v.get(key).and_then(Value::as_str).ok_or_else(|| DecodeError::missing(key))
}

#[inline]
pub fn array_field<'a>(v: &'a Value, key: &str) -> Result<&'a [Value], DecodeError> {
    v.get(key).and_then(Value::as_array).map(Vec::as_slice).ok_or_else(|| DecodeError::missing(key))
}

/// Optional numeric field: absent or `null` is `None`, malformed is an error.
#[inline]
pub fn opt_f64_field(v: &Value, key: &str) -> Result<Option<f64>, DecodeError> {
    match v.get(key) {
        None | Some(Value::Null) => Ok(None),
        some => parse_str_f64(some).map(Some).ok_or_else(|| DecodeError::missing(key)),
    }
}
