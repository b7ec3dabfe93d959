//! Per-backend results and the primary/shadow pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which side of a shadow test a backend plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendRole {
    /// Production model; its output is treated as ground truth.
    Primary,
    /// Candidate model under validation.
    Shadow,
}

impl BackendRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Shadow => "shadow",
        }
    }
}

impl std::fmt::Display for BackendRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one backend invocation.
///
/// On success `error` is `None`; on failure `output` is `Value::Null`,
/// `latency_ms` is zero and `error` carries the failure message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelResult {
    /// Identifier of the originating request.
    pub request_id: String,

    /// Name of the producing backend.
    pub model_name: String,

    /// Model output: number, string, bool, null or structured value.
    pub output: Value,

    /// Wall-clock latency reported for the invocation, in milliseconds.
    pub latency_ms: f64,

    /// Failure description, absent on success.
    #[serde(default)]
    pub error: Option<String>,

    /// When the result was produced.
    pub timestamp: DateTime<Utc>,
}

impl ModelResult {
    /// Build a successful result.
    pub fn success(
        request_id: impl Into<String>,
        model_name: impl Into<String>,
        output: Value,
        latency_ms: f64,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            model_name: model_name.into(),
            output,
            latency_ms: latency_ms.max(0.0),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Build the error-bearing result that stands in for a failed invocation.
    pub fn failure(request_id: impl Into<String>, role: BackendRole, error: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            model_name: role.as_str().to_string(),
            output: Value::Null,
            latency_ms: 0.0,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }

    /// Whether this result represents a failed invocation.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Both results of one shadow test, labelled by role rather than by
/// completion order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PairedResult {
    pub primary: ModelResult,
    pub shadow: ModelResult,
}

impl PairedResult {
    /// Borrow the result for a given role.
    pub fn get(&self, role: BackendRole) -> &ModelResult {
        match role {
            BackendRole::Primary => &self.primary,
            BackendRole::Shadow => &self.shadow,
        }
    }

    /// Request identifier shared by both results.
    pub fn request_id(&self) -> &str {
        &self.primary.request_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_display() {
        assert_eq!(BackendRole::Primary.to_string(), "primary");
        assert_eq!(BackendRole::Shadow.to_string(), "shadow");
    }

    #[test]
    fn test_failure_result_shape() {
        let r = ModelResult::failure("req-9", BackendRole::Shadow, "boom");
        assert_eq!(r.model_name, "shadow");
        assert_eq!(r.output, Value::Null);
        assert_eq!(r.latency_ms, 0.0);
        assert_eq!(r.error.as_deref(), Some("boom"));
        assert!(r.is_error());
    }

    #[test]
    fn test_success_clamps_negative_latency() {
        let r = ModelResult::success("req-1", "m", json!(1), -3.0);
        assert_eq!(r.latency_ms, 0.0);
        assert!(!r.is_error());
    }

    #[test]
    fn test_pair_lookup_by_role() {
        let pair = PairedResult {
            primary: ModelResult::success("req-1", "prod", json!(20), 50.0),
            shadow: ModelResult::success("req-1", "cand", json!(21), 80.0),
        };
        assert_eq!(pair.get(BackendRole::Primary).output, json!(20));
        assert_eq!(pair.get(BackendRole::Shadow).output, json!(21));
        assert_eq!(pair.request_id(), "req-1");
    }
}
