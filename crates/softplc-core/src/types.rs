// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Value types produced by source polls.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Value
// =============================================================================

/// A typed process value read from a field device.
///
/// # Examples
///
/// ```
/// use softplc_core::types::Value;
///
/// let temperature = Value::Float32(21.5);
/// assert_eq!(temperature.type_name(), "float32");
/// assert_eq!(temperature.as_f64(), Some(21.5));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    /// Boolean value (coils, discrete inputs)
    Bool(bool),

    /// Signed 16-bit integer
    Int16(i16),

    /// Unsigned 16-bit integer
    UInt16(u16),

    /// Signed 32-bit integer
    Int32(i32),

    /// Unsigned 32-bit integer
    UInt32(u32),

    /// Signed 64-bit integer
    Int64(i64),

    /// Unsigned 64-bit integer
    UInt64(u64),

    /// 32-bit floating point
    Float32(f32),

    /// 64-bit floating point
    Float64(f64),
}

impl Value {
    /// Returns the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int16(_) => "int16",
            Value::UInt16(_) => "uint16",
            Value::Int32(_) => "int32",
            Value::UInt32(_) => "uint32",
            Value::Int64(_) => "int64",
            Value::UInt64(_) => "uint64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
        }
    }

    /// Returns the boolean value, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as `f64`. Booleans map to `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(_) => None,
            Value::Int16(v) => Some(f64::from(*v)),
            Value::UInt16(v) => Some(f64::from(*v)),
            Value::Int32(v) => Some(f64::from(*v)),
            Value::UInt32(v) => Some(f64::from(*v)),
            Value::Int64(v) => Some(*v as f64),
            Value::UInt64(v) => Some(*v as f64),
            Value::Float32(v) => Some(f64::from(*v)),
            Value::Float64(v) => Some(*v),
        }
    }

    /// Returns `true` for numeric values.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Value::Bool(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::UInt16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::UInt16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

// =============================================================================
// VariableValue
// =============================================================================

/// A named value produced by one poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableValue {
    /// Variable name, unique within its source.
    pub name: String,
    /// Value read.
    pub value: Value,
}

impl VariableValue {
    /// Creates a new variable value.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Bool(true).as_f64(), None);
        assert_eq!(Value::Int16(-3).as_f64(), Some(-3.0));
        assert_eq!(Value::UInt32(70_000).as_f64(), Some(70_000.0));
        assert!(!Value::Bool(false).is_numeric());
        assert!(Value::Float64(0.5).is_numeric());
    }

    #[test]
    fn test_value_serde_shape() {
        let json = serde_json::to_value(Value::UInt16(42)).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "uint16", "value": 42 }));

        let back: Value = serde_json::from_value(json).unwrap();
        assert_eq!(back, Value::UInt16(42));
    }

    #[test]
    fn test_variable_value_display() {
        let v = VariableValue::new("pump_running", true);
        assert_eq!(v.to_string(), "pump_running=true");
    }
}
