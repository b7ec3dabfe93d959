//! Shadow dispatch: one request, two backends, always two results.
//!
//! Both invocations are polled from the same task via `tokio::join!`, so they
//! start before either completes and the total latency is bounded by the
//! slower backend. Each invocation runs inside its own failure boundary
//! (error, panic, optional timeout, request-id check) that converts any
//! failure into an error-bearing [`ModelResult`] for that side only.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, instrument};

use crate::backend::{BackendError, BackendResult, ModelBackend};
use crate::config::DispatchConfig;
use crate::domain::{BackendRole, InferenceRequest, InputData, ModelResult, PairedResult};
use crate::metrics::METRICS;
use crate::obs::{emit_backend_failed, emit_dispatch_started};

/// Fans a request out to a primary and a shadow backend.
///
/// Holds no mutable state; one dispatcher can serve many requests
/// concurrently.
#[derive(Clone)]
pub struct ShadowDispatcher {
    primary: Arc<dyn ModelBackend>,
    shadow: Arc<dyn ModelBackend>,
    backend_timeout: Option<Duration>,
}

impl std::fmt::Debug for ShadowDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowDispatcher")
            .field("primary", &self.primary.name())
            .field("shadow", &self.shadow.name())
            .field("backend_timeout", &self.backend_timeout)
            .finish()
    }
}

impl ShadowDispatcher {
    pub fn new(primary: Arc<dyn ModelBackend>, shadow: Arc<dyn ModelBackend>) -> Self {
        Self {
            primary,
            shadow,
            backend_timeout: None,
        }
    }

    /// Build a dispatcher with the timeout policy from `config`.
    pub fn from_config(
        primary: Arc<dyn ModelBackend>,
        shadow: Arc<dyn ModelBackend>,
        config: &DispatchConfig,
    ) -> Self {
        let dispatcher = Self::new(primary, shadow);
        match config.backend_timeout() {
            Some(limit) => dispatcher.with_timeout(limit),
            None => dispatcher,
        }
    }

    /// Bound each backend invocation independently by `limit`.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.backend_timeout = Some(limit);
        self
    }

    pub fn primary_name(&self) -> &str {
        self.primary.name()
    }

    pub fn shadow_name(&self) -> &str {
        self.shadow.name()
    }

    /// Run one shadow test.
    ///
    /// Never fails: a backend failure shows up as that side's
    /// [`ModelResult::error`], and the other side's result is kept as is.
    #[instrument(skip(self, input_data), fields(request_id = %request_id))]
    pub async fn run_shadow_test(&self, input_data: InputData, request_id: &str) -> PairedResult {
        let request = InferenceRequest::new(request_id, input_data);
        emit_dispatch_started(request_id, self.primary.name(), self.shadow.name());
        METRICS.inc_requests_dispatched();

        let (primary, shadow) = tokio::join!(
            self.invoke(BackendRole::Primary, self.primary.as_ref(), &request),
            self.invoke(BackendRole::Shadow, self.shadow.as_ref(), &request),
        );

        debug!(
            primary_ok = !primary.is_error(),
            shadow_ok = !shadow.is_error(),
            "shadow test settled"
        );
        PairedResult { primary, shadow }
    }

    async fn invoke(
        &self,
        role: BackendRole,
        backend: &dyn ModelBackend,
        request: &InferenceRequest,
    ) -> ModelResult {
        match self.guarded_predict(backend, request).await {
            Ok(result) => result,
            Err(err) => {
                METRICS.inc_backend_failures();
                emit_backend_failed(&request.request_id, role, backend.name(), &err);
                ModelResult::failure(request.request_id.clone(), role, err.to_string())
            }
        }
    }

    async fn guarded_predict(
        &self,
        backend: &dyn ModelBackend,
        request: &InferenceRequest,
    ) -> BackendResult<ModelResult> {
        let call = AssertUnwindSafe(backend.predict(request)).catch_unwind();

        let outcome = match self.backend_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| BackendError::Timeout {
                    limit_ms: limit.as_millis() as u64,
                })?,
            None => call.await,
        };

        let result = outcome.map_err(|payload| BackendError::Panicked(panic_message(&*payload)))??;

        if result.request_id != request.request_id {
            return Err(BackendError::RequestIdMismatch {
                expected: request.request_id.clone(),
                actual: result.request_id,
            });
        }
        Ok(result)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
