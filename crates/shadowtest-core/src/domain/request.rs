//! Inference requests as seen by both backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{Result, ShadowError};

/// Named input fields of a request.
pub type InputData = Map<String, Value>;

/// One canonical request, built once per shadow test and shared by reference
/// with the primary and the shadow backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceRequest {
    /// Caller-supplied identifier, unique per request.
    pub request_id: String,

    /// Input features for the model.
    pub data: InputData,

    /// When the request was constructed.
    pub timestamp: DateTime<Utc>,
}

impl InferenceRequest {
    /// Create a new request stamped with the current time.
    pub fn new(request_id: impl Into<String>, data: InputData) -> Self {
        Self {
            request_id: request_id.into(),
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Wire payload accepted by the request-triggering interface:
/// `{"request_id": "...", "data": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictPayload {
    pub request_id: String,
    pub data: InputData,
}

impl PredictPayload {
    /// Reject payloads that have no safe default.
    pub fn validate(&self) -> Result<()> {
        if self.request_id.trim().is_empty() {
            return Err(ShadowError::InvalidRequest(
                "request_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse a raw JSON value into a validated payload.
    ///
    /// Anything that is not an object with a string `request_id` and an
    /// object `data` is an unsupported input format.
    pub fn from_value(value: Value) -> Result<Self> {
        let payload: PredictPayload = serde_json::from_value(value)
            .map_err(|e| ShadowError::UnsupportedInputFormat(e.to_string()))?;
        payload.validate()?;
        Ok(payload)
    }
}
