//! customscalerd configuration file.
//!
//! ```toml
//! log_format = "text"
//!
//! [server]
//! port = 8443
//! data_dir = "/var/lib/customscaler"
//!
//! [controller]
//! workers = 2
//! resync_interval = "30s"
//!
//! [metrics]
//! backend = "fixed"
//! value = 30
//!
//! [workload]
//! backend = "store"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use customscaler_controller::{ControllerConfig, ReconcilerConfig};
use customscaler_state::{ScalingPolicy, WorkloadRecord};

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{field}: invalid duration {value:?} (expected e.g. \"30s\", \"500ms\", \"5m\")")]
    InvalidDuration { field: &'static str, value: String },

    #[error("{field}: duration must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub log_format: LogFormat,
    pub server: ServerConfig,
    pub controller: ControllerSection,
    pub metrics: MetricsBackend,
    pub workload: WorkloadBackend,
    /// Policies applied to the store at startup.
    pub policies: Vec<ScalingPolicy>,
    /// Workloads created at startup if not already present.
    pub workloads: Vec<WorkloadRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8443,
            data_dir: PathBuf::from("/var/lib/customscaler"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControllerSection {
    pub workers: usize,
    pub resync_interval: String,
    pub call_timeout: String,
    pub backoff_base: String,
    pub backoff_max: String,
    pub config_error_retry: String,
}

impl Default for ControllerSection {
    fn default() -> Self {
        Self {
            workers: 2,
            resync_interval: "30s".to_string(),
            call_timeout: "5s".to_string(),
            backoff_base: "1s".to_string(),
            backoff_max: "60s".to_string(),
            config_error_retry: "5m".to_string(),
        }
    }
}

/// Where metric samples come from.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum MetricsBackend {
    /// Constant values, with per-source overrides.
    Fixed {
        #[serde(default = "default_metric_value")]
        value: i32,
        #[serde(default)]
        overrides: HashMap<String, i32>,
    },
    /// Each policy's `metricSource` is an `http://` URL.
    Http {
        #[serde(default = "default_http_timeout")]
        timeout: String,
    },
}

impl Default for MetricsBackend {
    fn default() -> Self {
        MetricsBackend::Fixed {
            value: default_metric_value(),
            overrides: HashMap::new(),
        }
    }
}

/// Where replica counts are read and written.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum WorkloadBackend {
    /// Workload records in the local state store.
    #[default]
    Store,
    /// A remote customscaler-compatible workloads API at `host:port`.
    Http { endpoint: String },
}

fn default_metric_value() -> i32 {
    30
}

fn default_http_timeout() -> String {
    "5s".to_string()
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        content.parse()
    }

    /// Resolve the controller section into runtime settings.
    pub fn controller_configs(&self) -> Result<(ReconcilerConfig, ControllerConfig), ConfigFileError> {
        let c = &self.controller;
        if c.workers == 0 {
            return Err(ConfigFileError::Invalid(
                "controller.workers must be at least 1".to_string(),
            ));
        }
        let reconciler = ReconcilerConfig {
            call_timeout: duration_field("controller.call_timeout", &c.call_timeout)?,
            resync_interval: duration_field("controller.resync_interval", &c.resync_interval)?,
        };
        let controller = ControllerConfig {
            workers: c.workers,
            backoff_base: duration_field("controller.backoff_base", &c.backoff_base)?,
            backoff_max: duration_field("controller.backoff_max", &c.backoff_max)?,
            config_error_retry: duration_field(
                "controller.config_error_retry",
                &c.config_error_retry,
            )?,
        };
        if controller.backoff_base > controller.backoff_max {
            return Err(ConfigFileError::Invalid(
                "controller.backoff_base exceeds controller.backoff_max".to_string(),
            ));
        }
        Ok((reconciler, controller))
    }
}

impl std::str::FromStr for DaemonConfig {
    type Err = ConfigFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

/// Parse a configured duration; zero is rejected for every field.
pub fn duration_field(field: &'static str, value: &str) -> Result<Duration, ConfigFileError> {
    let duration = parse_duration(value).ok_or_else(|| ConfigFileError::InvalidDuration {
        field,
        value: value.to_string(),
    })?;
    if duration.is_zero() {
        return Err(ConfigFileError::ZeroDuration { field });
    }
    Ok(duration)
}

/// Parse "5s", "500ms", "2m" or a bare number of seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
