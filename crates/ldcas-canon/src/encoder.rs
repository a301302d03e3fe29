//! Canonical JSON encoding.
//!
//! Serialization is delegated to `canonical_json` (RFC 8785):
//! - Object keys are sorted; source order is discarded
//! - Arrays keep their order
//! - Strings escape `"`, `\` and control characters; everything else is
//!   emitted as raw UTF-8
//! - No whitespace between tokens
//!
//! Before serializing, numbers are normalized so that integral values print
//! as integers whether the input said `1`, `1.0` or `1e0`, and `-0` prints as
//! `0`.
//!
//! Keys are ordered by UTF-16 code units. This agrees with byte order except
//! when a key compares a supplementary-plane character (U+10000 and above)
//! against one in U+E000..=U+FFFF: the former sorts first here.

use canonical_json::to_string;
use serde::Serialize;
use serde_json::{Number, Value};

use crate::error::EncodeError;

/// 2^63 as an f64; integral floats below this magnitude fit in an i64.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;
/// 2^64 as an f64; non-negative integral floats below this fit in a u64.
const U64_BOUND: f64 = 18_446_744_073_709_551_616.0;

/// Encode a JSON value to canonical bytes.
pub fn encode(value: &Value) -> Result<Vec<u8>, EncodeError> {
    let canonical =
        to_string(&normalize_numbers(value)).map_err(|e| EncodeError::Canonical(e.to_string()))?;
    Ok(canonical.into_bytes())
}

/// Encode a single string as a canonical JSON string literal.
pub fn encode_str(s: &str) -> Result<Vec<u8>, EncodeError> {
    encode(&Value::String(s.to_owned()))
}

/// Encode any serializable value to canonical bytes.
///
/// Fails if the value has no JSON representation.
pub fn encode_serializable<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, EncodeError> {
    let value =
        serde_json::to_value(value).map_err(|e| EncodeError::Unrepresentable(e.to_string()))?;
    encode(&value)
}

/// Decode canonical (or any JSON) bytes back into a value.
pub fn decode(bytes: &[u8]) -> Result<Value, EncodeError> {
    serde_json::from_slice(bytes).map_err(|e| EncodeError::Decode(e.to_string()))
}

/// Rewrite integral floats as integers, recursively.
fn normalize_numbers(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(normalize_number(n)),
        Value::Array(items) => Value::Array(items.iter().map(normalize_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), normalize_numbers(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn normalize_number(n: &Number) -> Number {
    let Some(f) = n.as_f64().filter(|_| n.is_f64()) else {
        return n.clone();
    };
    if f == 0.0 {
        // Also folds -0.0.
        return Number::from(0);
    }
    if f.fract() == 0.0 {
        if f.abs() < I64_BOUND {
            return Number::from(f as i64);
        }
        if f > 0.0 && f < U64_BOUND {
            return Number::from(f as u64);
        }
    }
    n.clone()
}
