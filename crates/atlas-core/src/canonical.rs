// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::AtlasError;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};

/// Decimal places every float leaf is rounded to before hashing or emission.
pub const FLOAT_DECIMALS: u32 = 6;

const FLOAT_SCALE: f64 = 1e6;

/// Rounds a float to six decimal places, half away from zero.
///
/// Negative zero is normalized so `-0.0` and `0.0` hash identically.
pub fn round6(value: f64) -> f64 {
    let rounded = (value * FLOAT_SCALE).round() / FLOAT_SCALE;
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Rewrites a JSON tree into its canonical form: every float leaf
/// rounded to six decimals, every object key in sorted order.
///
/// Non-finite numbers cannot be represented canonically and are
/// rejected rather than silently degraded to null.
pub fn canonicalize(value: &Value) -> Result<Value, AtlasError> {
    match value {
        Value::Number(number) => {
            if let Some(float) = number.as_f64() {
                if !float.is_finite() {
                    return Err(AtlasError::numerical_issue(format!(
                        "non-finite number cannot be canonicalized: {float}"
                    )));
                }
                if number.is_f64() {
                    let rounded = round6(float);
                    let canonical = Number::from_f64(rounded).ok_or_else(|| {
                        AtlasError::numerical_issue(format!(
                            "rounded value is not representable: {rounded}"
                        ))
                    })?;
                    return Ok(Value::Number(canonical));
                }
            }
            Ok(value.clone())
        }
        Value::Array(items) => {
            let mut canonical = Vec::with_capacity(items.len());
            for item in items {
                canonical.push(canonicalize(item)?);
            }
            Ok(Value::Array(canonical))
        }
        Value::Object(entries) => {
            // serde_json's default map is BTree-backed, so re-inserting
            // entries yields sorted keys in the serialized output.
            let mut canonical = Map::new();
            for (key, entry) in entries {
                canonical.insert(key.clone(), canonicalize(entry)?);
            }
            Ok(Value::Object(canonical))
        }
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(value.clone()),
    }
}

/// Serializes a value to its canonical compact JSON string.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, AtlasError> {
    let raw = serde_json::to_value(value)
        .map_err(|err| AtlasError::invalid_input(format!("serialization failed: {err}")))?;
    let canonical = canonicalize(&raw)?;
    serde_json::to_string(&canonical)
        .map_err(|err| AtlasError::invalid_input(format!("canonical encoding failed: {err}")))
}

/// SHA-256 content hash (lowercase hex) of a value's canonical JSON.
pub fn content_hash<T: Serialize>(value: &T) -> Result<String, AtlasError> {
    let payload = canonical_json(value)?;
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
