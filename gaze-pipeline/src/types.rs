//! Core types for the gaze pipeline library
//!
//! This module defines the error type shared by every stage of the pipeline and
//! the dynamically-typed [`Value`] cell used for identifier and event property
//! columns. Numeric sample channels are plain `f64` with NaN marking a missing
//! sample; `Value::Null` is the missing marker for event columns.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, GazeError>;

/// Errors that can occur while transforming samples or detecting events
///
/// Every failure is synchronous and deterministic: the same input always
/// produces the same error, and no partial result is returned.
#[derive(Debug, thiserror::Error)]
pub enum GazeError {
    #[error("{name} must not be zero")]
    ZeroValue { name: String },

    #[error("invalid shape for {name}: {message}")]
    InvalidShape { name: &'static str, message: String },

    #[error("the sequences \"{left}\" ({left_len}) and \"{right}\" ({right_len}) must be of equal length")]
    LengthMismatch {
        left: String,
        left_len: usize,
        right: String,
        right_len: usize,
    },

    #[error("method \"{method}\" requires at least {min} samples, got {actual}")]
    TooFewSamples {
        method: &'static str,
        min: usize,
        actual: usize,
    },

    #[error("sampling_rate needs to be above zero (is: {0})")]
    InvalidSamplingRate(f64),

    #[error("unknown {kind} \"{value}\", valid options are: {valid:?}")]
    UnknownOption {
        kind: &'static str,
        value: String,
        valid: Vec<&'static str>,
    },

    #[error("threshold {threshold:?} does not exceed minimum_threshold ({minimum})")]
    ThresholdTooLow { threshold: [f64; 2], minimum: f64 },

    #[error("{argument} must be a pair of column names but is {value}")]
    InvalidColumns { argument: &'static str, value: String },

    #[error("property '{name}' is invalid. Valid properties are: {valid:?}")]
    InvalidProperty { name: String, valid: Vec<String> },

    #[error("missing columns: required {required:?}, available {available:?}")]
    MissingColumns {
        required: Vec<String>,
        available: Vec<String>,
    },

    #[error("experiment must be specified for {0}")]
    MissingExperiment(&'static str),

    #[error("invalid event interval: onset {onset} is after offset {offset}")]
    InvalidInterval { onset: i64, offset: i64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("numerical error: {0}")]
    Numerical(String),
}

impl GazeError {
    /// Create an unknown-option error listing the accepted values
    pub fn unknown_option(kind: &'static str, value: impl Into<String>, valid: &[&'static str]) -> Self {
        Self::UnknownOption {
            kind,
            value: value.into(),
            valid: valid.to_vec(),
        }
    }

    /// Create a length mismatch error for two named sequences
    pub fn length_mismatch(
        left: impl Into<String>,
        left_len: usize,
        right: impl Into<String>,
        right_len: usize,
    ) -> Self {
        Self::LengthMismatch {
            left: left.into(),
            left_len,
            right: right.into(),
            right_len,
        }
    }
}

/// A single cell of an identifier or event property column
///
/// Deserialized untagged, so JSON `1`, `1.5`, `"a"` and `null` map onto the
/// variants directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
    Null,
}

impl Value {
    /// Numeric view of the value (integers are widened)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view of the value
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// True for the missing marker
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// Floats compare by bit pattern so that values can key hash maps and sets.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Integer(_) => 1,
                Value::Float(_) => 2,
                Value::String(_) => 3,
            }
        }
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Integer(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:.4}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::Null => write!(f, "null"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::Integer(42).as_f64(), Some(42.0));
        assert_eq!(Value::Float(3.5).as_f64(), Some(3.5));
        assert_eq!(Value::Integer(7).as_i64(), Some(7));
        assert_eq!(Value::Float(7.0).as_i64(), None);
        assert!(Value::Null.is_null());
        assert_eq!(Value::from("s1"), Value::String("s1".into()));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(format!("{}", Value::Integer(42)), "42");
        assert_eq!(format!("{}", Value::Float(3.14159)), "3.1416");
        assert_eq!(format!("{}", Value::Null), "null");
    }

    #[test]
    fn test_value_hash_and_eq() {
        let mut set = HashSet::new();
        set.insert(Value::Float(1.0));
        set.insert(Value::Float(1.0));
        set.insert(Value::Integer(1));
        set.insert(Value::Null);
        assert_eq!(set.len(), 3);
        assert_ne!(Value::Integer(1), Value::Float(1.0));
    }

    #[test]
    fn test_value_untagged_json() {
        let values: Vec<Value> = serde_json::from_str(r#"[1, 2.5, "a", null]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Integer(1),
                Value::Float(2.5),
                Value::String("a".into()),
                Value::Null
            ]
        );
    }

    #[test]
    fn test_error_display() {
        let err = GazeError::TooFewSamples {
            method: "smooth",
            min: 6,
            actual: 4,
        };
        assert!(err.to_string().contains("smooth"));
        assert!(err.to_string().contains('6'));

        let err = GazeError::unknown_option("origin", "upper left", &["lower left", "center"]);
        assert!(err.to_string().contains("upper left"));
        assert!(err.to_string().contains("center"));
    }
}
