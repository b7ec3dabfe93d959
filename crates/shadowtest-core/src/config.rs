//! Runtime configuration.
//!
//! [`ShadowConfig`] is read from an optional TOML file and then overridden
//! from `SHADOWTEST_*` environment variables. Every section has defaults, so
//! an empty file (or no file) is a valid configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::{HttpModelBackend, MockModel, ModelBackend};
use crate::comparator::{Comparator, DEFAULT_RELATIVE_TOLERANCE};
use crate::domain::{ConfigError, Result};

/// Per-backend invocation policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DispatchConfig {
    /// Timeout applied to each backend independently. `None` waits forever.
    pub backend_timeout_ms: Option<u64>,
}

impl DispatchConfig {
    pub fn backend_timeout(&self) -> Option<Duration> {
        self.backend_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ComparatorConfig {
    /// Allowed `|primary - shadow| / |primary|` for numeric outputs.
    pub relative_tolerance: f64,
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self {
            relative_tolerance: DEFAULT_RELATIVE_TOLERANCE,
        }
    }
}

impl ComparatorConfig {
    pub fn comparator(&self) -> Comparator {
        Comparator::new(self.relative_tolerance)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Requests in flight at once during a batch.
    pub concurrency: usize,
    /// Where `report.html` and `regression_suite.json` are written.
    pub output_dir: PathBuf,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            output_dir: PathBuf::from("artifacts"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Remote model endpoints. An unset side falls back to its mock model.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendsConfig {
    /// `POST` endpoint of the production model.
    pub primary_url: Option<String>,
    /// `POST` endpoint of the candidate model.
    pub shadow_url: Option<String>,
}

impl BackendsConfig {
    /// `remote_primary` over HTTP when `primary_url` is set, else the mock production model.
    pub fn primary_backend(&self) -> Arc<dyn ModelBackend> {
        match &self.primary_url {
            Some(url) => Arc::new(HttpModelBackend::new("remote_primary", url.clone())),
            None => Arc::new(MockModel::production()),
        }
    }

    /// `remote_shadow` over HTTP when `shadow_url` is set, else the mock beta model.
    pub fn shadow_backend(&self) -> Arc<dyn ModelBackend> {
        match &self.shadow_url {
            Some(url) => Arc::new(HttpModelBackend::new("remote_shadow", url.clone())),
            None => Arc::new(MockModel::shadow_beta()),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShadowConfig {
    pub backends: BackendsConfig,
    pub dispatch: DispatchConfig,
    pub comparator: ComparatorConfig,
    pub simulation: SimulationConfig,
    pub server: ServerConfig,
}

impl ShadowConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: ShadowConfig = toml::from_str(raw).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_toml_str(&std::fs::read_to_string(p)?)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `SHADOWTEST_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SHADOWTEST_PRIMARY_URL") {
            self.backends.primary_url = Some(v);
        }
        if let Some(v) = lookup("SHADOWTEST_SHADOW_URL") {
            self.backends.shadow_url = Some(v);
        }
        if let Some(v) = lookup("SHADOWTEST_BACKEND_TIMEOUT_MS") {
            self.dispatch.backend_timeout_ms = Some(parse_field("dispatch.backend_timeout_ms", &v)?);
        }
        if let Some(v) = lookup("SHADOWTEST_RELATIVE_TOLERANCE") {
            self.comparator.relative_tolerance = parse_field("comparator.relative_tolerance", &v)?;
        }
        if let Some(v) = lookup("SHADOWTEST_CONCURRENCY") {
            self.simulation.concurrency = parse_field("simulation.concurrency", &v)?;
        }
        if let Some(v) = lookup("SHADOWTEST_OUTPUT_DIR") {
            self.simulation.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("SHADOWTEST_BIND") {
            self.server.bind = v;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        for (field, url) in [
            ("backends.primary_url", &self.backends.primary_url),
            ("backends.shadow_url", &self.backends.shadow_url),
        ] {
            if let Some(url) = url {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(invalid(field, "must be an http:// or https:// URL"));
                }
            }
        }
        let tol = self.comparator.relative_tolerance;
        if !tol.is_finite() || tol < 0.0 {
            return Err(invalid("comparator.relative_tolerance", "must be finite and non-negative"));
        }
        if self.simulation.concurrency == 0 {
            return Err(invalid("simulation.concurrency", "must be at least 1"));
        }
        if self.dispatch.backend_timeout_ms == Some(0) {
            return Err(invalid("dispatch.backend_timeout_ms", "must be positive when set"));
        }
        self.bind_addr()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .map_err(|e: std::net::AddrParseError| invalid("server.bind", &e.to_string()))
    }
}

fn parse_field<T>(field: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| invalid(field, &e.to_string()))
}

fn invalid(field: &str, reason: &str) -> crate::domain::ShadowError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
