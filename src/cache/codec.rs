//! Value encoding and numeric deltas shared by every backend.
//!
//! Values are stored as JSON text. `serde_json` keeps integers and floats
//! apart (`10` and `10.0` decode to different numbers), which is what lets
//! `incr`/`decr` preserve the numeric type of a stored value.

use serde_json::{Number, Value};

use crate::cache::CacheError;

pub fn encode(value: &Value) -> Result<String, CacheError> {
    Ok(serde_json::to_string(value)?)
}

pub fn decode(text: &str) -> Result<Value, CacheError> {
    Ok(serde_json::from_str(text)?)
}

/// Amount added by `incr` or subtracted by `decr`.
///
/// Integer deltas cover the whole `i64` and `u64` range of JSON integers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delta {
    Int(i128),
    Float(f64),
}

impl Delta {
    /// The opposite delta, used to turn `decr` into `incr`.
    pub fn negated(self, key: &str) -> Result<Self, CacheError> {
        match self {
            Delta::Int(delta) => delta
                .checked_neg()
                .map(Delta::Int)
                .ok_or_else(|| CacheError::Overflow(key.to_string())),
            Delta::Float(delta) => Ok(Delta::Float(-delta)),
        }
    }

    /// Add this delta to `current`.
    ///
    /// Integer plus integer stays an integer, or fails with
    /// [`CacheError::Overflow`] outside the JSON integer range; a float on
    /// either side gives a float.
    pub fn apply(self, key: &str, current: &Number) -> Result<Number, CacheError> {
        match (self, as_integer(current)) {
            (Delta::Int(delta), Some(current)) => current
                .checked_add(delta)
                .and_then(integer_number)
                .ok_or_else(|| CacheError::Overflow(key.to_string())),
            (delta, _) => {
                let current = current
                    .as_f64()
                    .ok_or_else(|| CacheError::NotANumber(key.to_string()))?;
                let delta = match delta {
                    Delta::Int(delta) => delta as f64,
                    Delta::Float(delta) => delta,
                };
                Number::from_f64(current + delta).ok_or_else(|| CacheError::Overflow(key.to_string()))
            }
        }
    }
}

fn as_integer(number: &Number) -> Option<i128> {
    number
        .as_i64()
        .map(i128::from)
        .or_else(|| number.as_u64().map(i128::from))
}

fn integer_number(value: i128) -> Option<Number> {
    if let Ok(value) = i64::try_from(value) {
        Some(Number::from(value))
    } else {
        u64::try_from(value).ok().map(Number::from)
    }
}

impl From<i64> for Delta {
    fn from(delta: i64) -> Self {
        Delta::Int(i128::from(delta))
    }
}

impl From<u64> for Delta {
    fn from(delta: u64) -> Self {
        Delta::Int(i128::from(delta))
    }
}

impl From<f64> for Delta {
    fn from(delta: f64) -> Self {
        Delta::Float(delta)
    }
}

impl TryFrom<Value> for Delta {
    type Error = CacheError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Number(ref number) => {
                if let Some(delta) = as_integer(number) {
                    Ok(Delta::Int(delta))
                } else {
                    number
                        .as_f64()
                        .map(Delta::Float)
                        .ok_or_else(|| CacheError::BadDelta(value.to_string()))
                }
            }
            other => Err(CacheError::BadDelta(other.to_string())),
        }
    }
}

/// Apply `delta` to the encoded value of `key`, returning the new number
/// and its encoding.
pub fn increment(key: &str, encoded: &str, delta: Delta) -> Result<(Number, String), CacheError> {
    let current = match decode(encoded)? {
        Value::Number(number) => number,
        _ => return Err(CacheError::NotANumber(key.to_string())),
    };
    let next = delta.apply(key, &current)?;
    let encoded = encode(&Value::Number(next.clone()))?;
    Ok((next, encoded))
}
