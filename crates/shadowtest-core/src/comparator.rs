//! Output comparison.
//!
//! Turns a primary/shadow pair into a [`Verdict`]. Pure: no I/O, no shared
//! state.
//!
//! Match rules, branching on the tag pair of the two outputs:
//! - number vs number: `|p - s| <= tolerance * |p|` (relative to primary; a
//!   zero primary therefore demands an exact zero shadow)
//! - anything else: structural equality, `null` only equals `null`; numbers
//!   nested in arrays or objects are equal by value, so `[1]` equals `[1.0]`
//!
//! A comparison that cannot be evaluated counts as a mismatch.

use serde_json::Value;
use tracing::trace;

use crate::domain::{ModelResult, PairedResult, Verdict};

/// Default relative tolerance for numeric outputs (0.1%).
pub const DEFAULT_RELATIVE_TOLERANCE: f64 = 0.001;

/// Reasons a comparison could not be evaluated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompareError {
    #[error("numeric comparison of {primary} and {shadow} is not finite")]
    NonFinite { primary: f64, shadow: f64 },

    #[error("number {0} is not representable as f64")]
    Unrepresentable(String),
}

/// Compares outputs with a relative numeric tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparator {
    relative_tolerance: f64,
}

impl Default for Comparator {
    fn default() -> Self {
        Self {
            relative_tolerance: DEFAULT_RELATIVE_TOLERANCE,
        }
    }
}

impl Comparator {
    /// `relative_tolerance` is expected to be finite and non-negative; the
    /// config layer validates it.
    pub fn new(relative_tolerance: f64) -> Self {
        Self { relative_tolerance }
    }

    pub fn relative_tolerance(&self) -> f64 {
        self.relative_tolerance
    }

    /// Compute the verdict for one pair of results.
    pub fn compare(&self, primary: &ModelResult, shadow: &ModelResult) -> Verdict {
        let is_match = match self.outputs_match(&primary.output, &shadow.output) {
            Ok(matched) => matched,
            Err(err) => {
                trace!(request_id = %primary.request_id, error = %err, "comparison downgraded to mismatch");
                false
            }
        };

        Verdict {
            request_id: primary.request_id.clone(),
            is_match,
            primary_out: primary.output.clone(),
            shadow_out: shadow.output.clone(),
            latency_delta_ms: round2(shadow.latency_ms - primary.latency_ms),
            primary_latency: primary.latency_ms,
            shadow_latency: shadow.latency_ms,
            error_primary: primary.error.clone().unwrap_or_default(),
            error_shadow: shadow.error.clone().unwrap_or_default(),
        }
    }

    /// Compare both sides of a [`PairedResult`].
    pub fn compare_pair(&self, pair: &PairedResult) -> Verdict {
        self.compare(&pair.primary, &pair.shadow)
    }

    fn outputs_match(&self, primary: &Value, shadow: &Value) -> Result<bool, CompareError> {
        match (primary, shadow) {
            (Value::Number(p), Value::Number(s)) => {
                let p = p
                    .as_f64()
                    .ok_or_else(|| CompareError::Unrepresentable(p.to_string()))?;
                let s = s
                    .as_f64()
                    .ok_or_else(|| CompareError::Unrepresentable(s.to_string()))?;
                let diff = (p - s).abs();
                let allowed = self.relative_tolerance * p.abs();
                if !diff.is_finite() || !allowed.is_finite() {
                    return Err(CompareError::NonFinite {
                        primary: p,
                        shadow: s,
                    });
                }
                Ok(diff <= allowed)
            }
            (p, s) => Ok(values_equal(p, s)),
        }
    }
}

/// Structural equality with numbers compared by value, exactly.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        (a, b) => a == b,
    }
}

/// Compare with the default tolerance.
pub fn compare(primary: &ModelResult, shadow: &ModelResult) -> Verdict {
    Comparator::default().compare(primary, shadow)
}

/// Two decimals, ties to even (0.125 -> 0.12).
fn round2(x: f64) -> f64 {
    (x * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(output: Value, latency_ms: f64) -> ModelResult {
        ModelResult::success("req-1", "m", output, latency_ms)
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(30.0), 30.0);
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(-1.236), -1.24);
    }

    #[test]
    fn test_round2_ties_to_even() {
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(-0.125), -0.12);
    }

    #[test]
    fn test_values_equal_recurses() {
        assert!(values_equal(&json!({"a": [1, {"b": 2}]}), &json!({"a": [1.0, {"b": 2.0}]})));
        assert!(!values_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!values_equal(&json!([1, 2]), &json!([1, 2, 3])));
        assert!(!values_equal(&json!({"a": 1}), &json!({"b": 1})));
    }

    #[test]
    fn test_overflowing_difference_is_mismatch() {
        let c = Comparator::default();
        let err = c
            .outputs_match(&json!(f64::MAX), &json!(-f64::MAX))
            .unwrap_err();
        assert!(matches!(err, CompareError::NonFinite { .. }));

        let v = c.compare(&result(json!(f64::MAX), 0.0), &result(json!(-f64::MAX), 0.0));
        assert!(!v.is_match);
    }

    #[test]
    fn test_integer_and_float_compare_numerically() {
        let v = compare(&result(json!(20), 1.0), &result(json!(20.0), 1.0));
        assert!(v.is_match);
    }

    #[test]
    fn test_custom_tolerance() {
        let c = Comparator::new(0.01);
        assert!(c.compare(&result(json!(100), 0.0), &result(json!(100.9), 0.0)).is_match);
        assert!(!c.compare(&result(json!(100), 0.0), &result(json!(101.1), 0.0)).is_match);
    }

    #[test]
    fn test_bool_is_not_numeric() {
        let v = compare(&result(json!(true), 0.0), &result(json!(1), 0.0));
        assert!(!v.is_match);
    }
}
