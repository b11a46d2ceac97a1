//! Metric sources: where the reconciler gets its numeric sample.
//!
//! A metric source string is opaque to the reconciler. Each implementation
//! decides what it means: a lookup key for [`FixedMetricSource`], a URL for
//! [`HttpMetricSource`].

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use http::Method;
use thiserror::Error;
use tracing::debug;

use crate::http::{HttpError, HttpTarget, send};

/// Boxed future returned by [`MetricSource::sample`].
pub type SampleFuture<'a> = Pin<Box<dyn Future<Output = Result<i32, MetricError>> + Send + 'a>>;

/// Why a metric sample could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricError {
    /// The source string is not something this backend can query, or the
    /// backend answered with something that is not a metric value.
    #[error("invalid metric source: {0}")]
    InvalidSource(String),

    /// The backend could not be reached or did not answer successfully.
    #[error("metric backend unreachable: {0}")]
    Unreachable(String),
}

/// Capability interface for reading a single metric sample.
pub trait MetricSource: Send + Sync {
    /// Sample the current value of `source`.
    fn sample<'a>(&'a self, source: &'a str) -> SampleFuture<'a>;

    /// Short backend name for logs.
    fn kind(&self) -> &'static str;
}

// ── Fixed ──────────────────────────────────────────────────────────

/// Returns configured values without any I/O.
///
/// Every non-empty source yields `default_value` unless an override for that
/// exact source string exists.
#[derive(Debug, Clone)]
pub struct FixedMetricSource {
    default_value: i32,
    overrides: HashMap<String, i32>,
}

impl FixedMetricSource {
    pub fn new(default_value: i32) -> Self {
        Self {
            default_value,
            overrides: HashMap::new(),
        }
    }

    /// Use `value` for `source` instead of the default.
    pub fn with_override(mut self, source: &str, value: i32) -> Self {
        self.overrides.insert(source.to_string(), value);
        self
    }

    pub fn with_overrides(mut self, overrides: HashMap<String, i32>) -> Self {
        self.overrides.extend(overrides);
        self
    }

    fn lookup(&self, source: &str) -> Result<i32, MetricError> {
        if source.trim().is_empty() {
            return Err(MetricError::InvalidSource("empty metric source".to_string()));
        }
        Ok(self
            .overrides
            .get(source)
            .copied()
            .unwrap_or(self.default_value))
    }
}

impl MetricSource for FixedMetricSource {
    fn sample<'a>(&'a self, source: &'a str) -> SampleFuture<'a> {
        let result = self.lookup(source);
        Box::pin(async move { result })
    }

    fn kind(&self) -> &'static str {
        "fixed"
    }
}

// ── HTTP ───────────────────────────────────────────────────────────

/// Reads a metric by issuing `GET` against the source URL.
///
/// The response body must be a bare number (`42`) or a JSON object with a
/// numeric `value` field (`{"value": 42}`). Fractional values are rounded.
#[derive(Debug, Clone)]
pub struct HttpMetricSource {
    timeout: Duration,
}

impl HttpMetricSource {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn fetch(&self, source: &str) -> Result<i32, MetricError> {
        let target = HttpTarget::parse(source)
            .map_err(|e| MetricError::InvalidSource(e.to_string()))?;

        let response = send(Method::GET, &target, None, self.timeout)
            .await
            .map_err(|e| match e {
                HttpError::InvalidUrl { .. } => MetricError::InvalidSource(e.to_string()),
                other => MetricError::Unreachable(other.to_string()),
            })?;

        if !response.status.is_success() {
            return Err(MetricError::Unreachable(format!(
                "{source} answered {}",
                response.status
            )));
        }

        let value = parse_metric_body(&response.body)?;
        debug!(%source, value, "metric sampled");
        Ok(value)
    }
}

impl MetricSource for HttpMetricSource {
    fn sample<'a>(&'a self, source: &'a str) -> SampleFuture<'a> {
        Box::pin(self.fetch(source))
    }

    fn kind(&self) -> &'static str {
        "http"
    }
}

/// Parse a metric response body into an `i32` sample.
pub fn parse_metric_body(body: &[u8]) -> Result<i32, MetricError> {
    let text = std::str::from_utf8(body)
        .map_err(|_| MetricError::InvalidSource("metric body is not utf-8".to_string()))?
        .trim();

    let number = match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::Number(n)) => n.as_f64(),
        Ok(serde_json::Value::Object(map)) => map.get("value").and_then(|v| v.as_f64()),
        _ => None,
    };

    let value = number
        .filter(|v| v.is_finite())
        .ok_or_else(|| MetricError::InvalidSource(format!("not a metric value: {text:?}")))?
        .round();

    if value < f64::from(i32::MIN) || value > f64::from(i32::MAX) {
        return Err(MetricError::InvalidSource(format!(
            "metric value {value} out of range"
        )));
    }
    Ok(value as i32)
}
