//! Structured observability hooks for the shadow testing lifecycle.
//!
//! This module provides:
//! - Request-scoped tracing spans via the `RequestSpan` RAII guard
//! - Emission functions for dispatch, backend failure, verdict, batch
//!   completion and report output
//!
//! Events are emitted at `info!` level except backend failures (`warn!`).
//! Set `RUST_LOG` to tune verbosity and pass `--json` for JSON lines.

use std::path::Path;

use tracing::{info, warn};

use crate::domain::{BackendRole, Verdict};
use crate::metrics::METRICS;

/// RAII guard that enters a request-scoped span.
///
/// # Example
///
/// ```ignore
/// let _span = RequestSpan::enter("req_42");
/// // tracing calls below carry request_id = "req_42"
/// ```
pub struct RequestSpan {
    _span: tracing::span::EnteredSpan,
}

impl RequestSpan {
    pub fn enter(request_id: &str) -> Self {
        let span = tracing::info_span!("shadowtest.request", request_id = %request_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: a request was fanned out to both backends.
pub fn emit_dispatch_started(request_id: &str, primary: &str, shadow: &str) {
    info!(
        event = "dispatch.started",
        request_id = %request_id,
        primary = %primary,
        shadow = %shadow,
    );
}

/// Emit event: one backend invocation failed and was isolated (warn level).
pub fn emit_backend_failed(
    request_id: &str,
    role: BackendRole,
    model: &str,
    error: &dyn std::fmt::Display,
) {
    warn!(
        event = "backend.failed",
        request_id = %request_id,
        role = %role,
        model = %model,
        error = %error,
    );
}

/// Emit event: a verdict was produced.
pub fn emit_verdict(verdict: &Verdict) {
    info!(
        event = "verdict.produced",
        request_id = %verdict.request_id,
        matched = verdict.is_match,
        latency_delta_ms = verdict.latency_delta_ms,
    );
}

/// Emit the verdict event and count it if it is a mismatch.
pub fn record_verdict(verdict: &Verdict) {
    if !verdict.is_match {
        METRICS.inc_mismatches();
    }
    emit_verdict(verdict);
}

/// Emit event: a batch finished.
pub fn emit_simulation_finished(run_id: &str, total: usize, failed: usize, duration_ms: u64) {
    info!(
        event = "simulation.finished",
        run_id = %run_id,
        total = total,
        failed = failed,
        duration_ms = duration_ms,
    );
}

/// Emit event: a report artifact was written.
pub fn emit_report_written(kind: &str, path: &Path, records: usize) {
    info!(
        event = "report.written",
        kind = %kind,
        path = %path.display(),
        records = records,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_span_create() {
        let _span = RequestSpan::enter("test-request-id");
    }
}
