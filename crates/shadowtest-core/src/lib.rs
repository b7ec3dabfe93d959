//! Shadowtest Core Library
//!
//! Runs every request against a primary and a shadow model at the same time,
//! compares the two outputs, and turns mismatches into regression cases.
//!
//! The pieces, in request order:
//! - [`backend`]: the `ModelBackend` capability plus mock and HTTP backends
//! - [`dispatcher`]: concurrent fan-out with per-backend failure isolation
//! - [`comparator`]: pure output comparison producing a [`Verdict`]
//! - [`simulation`]: batch driver over loaded or synthetic inputs
//! - [`reporting`]: HTML report and regression corpus artifacts

pub mod backend;
pub mod comparator;
pub mod config;
pub mod data;
pub mod dispatcher;
pub mod domain;
pub mod metrics;
pub mod obs;
pub mod reporting;
pub mod simulation;
pub mod telemetry;

pub use backend::{BackendError, BackendResult, HttpModelBackend, MockModel, ModelBackend};
pub use comparator::{compare, CompareError, Comparator, DEFAULT_RELATIVE_TOLERANCE};
pub use config::{
    BackendsConfig, ComparatorConfig, DispatchConfig, ServerConfig, ShadowConfig, SimulationConfig,
};
pub use data::{LogLoader, SyntheticGenerator};
pub use dispatcher::ShadowDispatcher;
pub use domain::{
    BackendRole, ConfigError, InferenceRequest, InputData, ModelResult, PairedResult,
    PredictPayload, Result, ShadowError, Verdict,
};
pub use reporting::{
    extract_regressions, input_digest, load_regression_suite, merge_regression_corpus,
    render_html_report, write_html_report, write_regression_suite, RegressionCase,
    SimulationSummary,
};
pub use simulation::{BatchItem, ShadowSimulation, SimulationOutcome};

pub use metrics::METRICS;
pub use obs::{
    emit_backend_failed, emit_dispatch_started, emit_report_written, emit_simulation_finished,
    emit_verdict, record_verdict, RequestSpan,
};
pub use telemetry::init_tracing;

/// Shadowtest version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
