//! Datapoint values.
//!
//! The integer/decimal distinction is decided once, when a value is
//! deserialized, so renderers never have to sniff types again.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single numeric datapoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
}

impl Value {
    pub fn as_f64(self) -> f64 {
        match self {
            Value::Int(v) => v as f64,
            Value::Float(v) => v,
        }
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

/// Plain textual form, suitable for tabular output.
///
/// Floats always keep a fractional part (`7.0`, not `7`) so a re-parser can
/// tell the two kinds apart.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:?}"),
        }
    }
}
