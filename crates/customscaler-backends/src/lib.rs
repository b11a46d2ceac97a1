//! customscaler-backends: clients for the reconciler's external collaborators.
//!
//! Two capability traits, each with a test-friendly and a networked
//! implementation:
//!
//! | Trait | Implementations |
//! |---|---|
//! | [`MetricSource`] | [`FixedMetricSource`], [`HttpMetricSource`] |
//! | [`WorkloadControlPlane`] | [`StoreWorkloads`], [`HttpWorkloads`] |
//!
//! Which implementation runs is decided by configuration at process start;
//! the reconciler only sees `Arc<dyn Trait>`.

pub mod http;
pub mod metric;
pub mod workload;

pub use metric::{FixedMetricSource, HttpMetricSource, MetricError, MetricSource, SampleFuture};
pub use workload::{
    HttpWorkloads, StoreWorkloads, WorkloadControlPlane, WorkloadError, WorkloadFuture,
};
