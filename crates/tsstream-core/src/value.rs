//! Module: value
//! Responsibility: opportunistic coercion of raw field text into typed values.
//! Does not own: field storage or ordering; see `record`.
//! Boundary: every comparison in the filter compiler and every accumulator in
//! the aggregation engine goes through `Value`.

use std::cmp::Ordering;

///
/// Value
///
/// Dynamic value typing over raw field text. Every stored value is textual;
/// numeric interpretation happens here, at query time. Floats keep their
/// original textual form so they round-trip exactly as the caller supplied
/// them instead of being lossily reparsed through a native `f64`.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64, String),
    Bool(bool),
    Str(String),
}

impl Value {
    /// Coerce one raw text token using the engine's auto-detection rules:
    /// integer, then fractional number (text preserved), then boolean,
    /// otherwise string.
    #[must_use]
    pub fn coerce(raw: &str) -> Self {
        if let Ok(i) = raw.parse::<i64>() {
            return Self::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                return Self::Float(f, raw.to_string());
            }
        }
        match raw {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        Self::Str(raw.to_string())
    }

    /// Best-effort numeric view, used by comparisons and accumulators that
    /// need a float regardless of how the value was originally typed.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f, _) => Some(*f),
            Self::Bool(_) | Self::Str(_) => None,
        }
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_, _))
    }

    /// Render back to the raw textual form used in replies. Integers never
    /// show a trailing `.0`; floats keep their original text exactly.
    #[must_use]
    pub fn to_raw(&self) -> String {
        match self {
            Self::Int(i) => i.to_string(),
            Self::Float(_, text) => text.clone(),
            Self::Bool(b) => b.to_string(),
            Self::Str(s) => s.clone(),
        }
    }

    /// Order two values the way the filter DSL and `min`/`max` accumulators
    /// do: numeric comparison when both sides carry a number, lexicographic
    /// otherwise.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => self.to_raw().cmp(&other.to_raw()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_round_trip_without_trailing_zero() {
        assert_eq!(Value::coerce("42").to_raw(), "42");
        assert_eq!(Value::coerce("-7").to_raw(), "-7");
    }

    #[test]
    fn floats_preserve_original_text() {
        let v = Value::coerce("3.140");
        assert_eq!(v.to_raw(), "3.140");
        assert!(matches!(v, Value::Float(f, _) if (f - 3.14).abs() < f64::EPSILON));
    }

    #[test]
    fn booleans_and_strings() {
        assert_eq!(Value::coerce("true"), Value::Bool(true));
        assert_eq!(Value::coerce("false"), Value::Bool(false));
        assert_eq!(Value::coerce("hello"), Value::Str("hello".to_string()));
    }

    #[test]
    fn numeric_compare_crosses_int_and_float() {
        let a = Value::coerce("10");
        let b = Value::coerce("10.5");
        assert_eq!(a.compare(&b), Ordering::Less);
    }

    #[test]
    fn non_numeric_compare_is_lexicographic() {
        let a = Value::coerce("banana");
        let b = Value::coerce("apple");
        assert_eq!(a.compare(&b), Ordering::Greater);
    }
}
