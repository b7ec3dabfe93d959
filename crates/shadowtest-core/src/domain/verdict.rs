//! Comparison verdicts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Read-only outcome of comparing one primary/shadow pair.
///
/// Serializes to the flat JSON object returned by `POST /predict`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Verdict {
    pub request_id: String,

    /// Whether the shadow output agrees with the primary output.
    #[serde(rename = "match")]
    pub is_match: bool,

    pub primary_out: Value,
    pub shadow_out: Value,

    /// `shadow_latency - primary_latency`, rounded to two decimals.
    /// Positive means the shadow backend was slower.
    pub latency_delta_ms: f64,

    pub primary_latency: f64,
    pub shadow_latency: f64,

    /// Empty when the primary invocation succeeded.
    #[serde(default)]
    pub error_primary: String,

    /// Empty when the shadow invocation succeeded.
    #[serde(default)]
    pub error_shadow: String,
}

impl Verdict {
    /// The error to attribute to this verdict: shadow first, then primary.
    pub fn first_error(&self) -> Option<&str> {
        [self.error_shadow.as_str(), self.error_primary.as_str()]
            .into_iter()
            .find(|e| !e.is_empty())
    }
}
