//! Process-wide atomic counters.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit the current values as a single
//! `tracing::info!` event (e.g. at the end of a batch).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, lock-free.
pub struct Metrics {
    requests_dispatched: AtomicU64,
    backend_failures: AtomicU64,
    mismatches: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            requests_dispatched: AtomicU64::new(0),
            backend_failures: AtomicU64::new(0),
            mismatches: AtomicU64::new(0),
        }
    }

    pub fn inc_requests_dispatched(&self) {
        self.requests_dispatched.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "requests_dispatched", "counter incremented");
    }

    pub fn inc_backend_failures(&self) {
        self.backend_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "backend_failures", "counter incremented");
    }

    pub fn inc_mismatches(&self) {
        self.mismatches.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "mismatches", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            requests_dispatched = self.requests_dispatched(),
            backend_failures = self.backend_failures(),
            mismatches = self.mismatches(),
        );
    }

    pub fn requests_dispatched(&self) -> u64 {
        self.requests_dispatched.load(Ordering::Relaxed)
    }

    pub fn backend_failures(&self) -> u64 {
        self.backend_failures.load(Ordering::Relaxed)
    }

    pub fn mismatches(&self) -> u64 {
        self.mismatches.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.requests_dispatched.store(0, Ordering::Relaxed);
        self.backend_failures.store(0, Ordering::Relaxed);
        self.mismatches.store(0, Ordering::Relaxed);
    }
}
