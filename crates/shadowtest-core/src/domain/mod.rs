//! Domain models for shadow testing.
//!
//! Canonical definitions for the core entities:
//! - `InferenceRequest`: Immutable request shared by both backends
//! - `ModelResult`: Outcome of one backend invocation
//! - `PairedResult`: Primary + shadow results for one request
//! - `Verdict`: Comparison outcome handed to sinks

pub mod error;
pub mod request;
pub mod result;
pub mod verdict;

// Re-export main types and errors
pub use error::{ConfigError, Result, ShadowError};
pub use request::{InferenceRequest, InputData, PredictPayload};
pub use result::{BackendRole, ModelResult, PairedResult};
pub use verdict::Verdict;
