//! Model backends.
//!
//! A backend is anything that can turn an [`InferenceRequest`] into a
//! [`ModelResult`]. The dispatcher only knows this capability; which model
//! sits behind it is decided at construction time by injecting an
//! `Arc<dyn ModelBackend>`.
//!
//! # Modules
//!
//! - [`mock`]: `MockModel`, in-process doubling model with a simulated delay
//! - [`http`]: `HttpModelBackend`, a remote model reached over HTTP

pub mod http;
pub mod mock;

use async_trait::async_trait;

use crate::domain::{InferenceRequest, ModelResult};

pub use http::HttpModelBackend;
pub use mock::MockModel;

/// Failures a backend invocation can end in.
///
/// None of these escape the dispatcher: each one is turned into an
/// error-bearing [`ModelResult`] for the failing side only.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("model failed: {0}")]
    Failed(String),

    #[error("invalid model input: {0}")]
    InvalidInput(String),

    #[error("remote model returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model invocation timed out after {limit_ms}ms")]
    Timeout { limit_ms: u64 },

    #[error("model panicked: {0}")]
    Panicked(String),

    #[error("model answered for request {actual}, expected {expected}")]
    RequestIdMismatch { expected: String, actual: String },
}

/// Result type for backend invocations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// The single capability the dispatcher depends on.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Name reported in successful results.
    fn name(&self) -> &str;

    /// Produce a prediction for `request`.
    ///
    /// Implementations do not impose their own timeout; that policy belongs
    /// to the dispatcher.
    async fn predict(&self, request: &InferenceRequest) -> BackendResult<ModelResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::Timeout { limit_ms: 250 };
        assert!(err.to_string().contains("250ms"));

        let err = BackendError::Status {
            status: 503,
            body: "unavailable".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("unavailable"));

        let err = BackendError::RequestIdMismatch {
            expected: "req-1".to_string(),
            actual: "req-2".to_string(),
        };
        assert!(err.to_string().contains("expected req-1"));
    }
}
