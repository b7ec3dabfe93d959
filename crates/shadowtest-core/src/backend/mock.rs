//! In-process mock models.
//!
//! `MockModel` doubles the `value` input field after a simulated delay. The
//! shadow preset carries a deliberate defect above a threshold so that a
//! simulation has something to catch.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{BackendError, BackendResult, ModelBackend};
use crate::domain::{InferenceRequest, ModelResult};

/// Input field the mock models read.
pub const VALUE_FIELD: &str = "value";

/// Doubling model with a configurable delay, defect and failure.
#[derive(Debug, Clone)]
pub struct MockModel {
    name: String,
    delay: Duration,
    defect_above: Option<f64>,
    failure: Option<String>,
}

impl MockModel {
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
            defect_above: None,
            failure: None,
        }
    }

    /// Production preset: `value * 2` after 50ms.
    pub fn production() -> Self {
        Self::new("production_v1", Duration::from_millis(50))
    }

    /// Candidate preset: `value * 2` after 80ms, off by one above 80.
    pub fn shadow_beta() -> Self {
        Self::new("shadow_v2-beta", Duration::from_millis(80)).with_defect_above(80.0)
    }

    /// Add one to the output whenever the input exceeds `threshold`.
    pub fn with_defect_above(mut self, threshold: f64) -> Self {
        self.defect_above = Some(threshold);
        self
    }

    /// Fail every invocation with `message` once the delay has elapsed.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    fn compute(&self, input: &Value) -> BackendResult<Value> {
        let n = match input {
            Value::Number(n) => n,
            other => {
                return Err(BackendError::InvalidInput(format!(
                    "`{VALUE_FIELD}` must be a number, got {other}"
                )))
            }
        };

        if let Some(i) = n.as_i64() {
            let doubled = i.checked_mul(2).ok_or_else(|| {
                BackendError::InvalidInput(format!("`{VALUE_FIELD}` {i} is out of range"))
            })?;
            let defect = self.defect_above.is_some_and(|t| (i as f64) > t);
            return Ok(json!(if defect { doubled + 1 } else { doubled }));
        }

        let x = n.as_f64().unwrap_or(0.0);
        let defect = self.defect_above.is_some_and(|t| x > t);
        Ok(json!(if defect { x * 2.0 + 1.0 } else { x * 2.0 }))
    }
}

#[async_trait]
impl ModelBackend for MockModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn predict(&self, request: &InferenceRequest) -> BackendResult<ModelResult> {
        tokio::time::sleep(self.delay).await;

        if let Some(message) = &self.failure {
            return Err(BackendError::Failed(message.clone()));
        }

        let input = request.data.get(VALUE_FIELD).cloned().unwrap_or(json!(0));
        let output = self.compute(&input)?;

        Ok(ModelResult::success(
            request.request_id.clone(),
            self.name.clone(),
            output,
            self.delay.as_secs_f64() * 1000.0,
        ))
    }
}
