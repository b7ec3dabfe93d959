//! Domain-level error taxonomy for shadow testing.
//!
//! Backend failures ([`crate::backend::BackendError`]) and comparison
//! failures ([`crate::comparator::CompareError`]) are recovered locally and
//! never reach this type. What is left here is surfaced to the caller.

/// Errors produced while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Shadow testing domain errors.
#[derive(Debug, thiserror::Error)]
pub enum ShadowError {
    #[error("unsupported input format: {0}")]
    UnsupportedInputFormat(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for shadow testing domain operations.
pub type Result<T> = std::result::Result<T, ShadowError>;
