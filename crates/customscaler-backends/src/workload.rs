//! Workload control planes: read and write a workload's replica count.
//!
//! The reconciler does a plain read-modify-write through this interface.
//! Neither implementation offers compare-and-swap, so a concurrent external
//! writer can lose an update.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use http::{Method, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use customscaler_state::{ReplicaCount, StateStore, WorkloadRef};

use crate::http::{HttpTarget, send};

/// Boxed future returned by [`WorkloadControlPlane`] methods.
pub type WorkloadFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, WorkloadError>> + Send + 'a>>;

/// Failure talking to the workload control plane.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkloadError {
    #[error("workload {0} not found")]
    NotFound(String),

    #[error("workload control plane unavailable: {0}")]
    Unavailable(String),
}

/// Get/set access to the replica count of a scalable workload.
pub trait WorkloadControlPlane: Send + Sync {
    fn get_replica_count<'a>(&'a self, workload: &'a WorkloadRef) -> WorkloadFuture<'a, i32>;

    fn set_replica_count<'a>(
        &'a self,
        workload: &'a WorkloadRef,
        replicas: i32,
    ) -> WorkloadFuture<'a, ()>;

    /// Short backend name for logs.
    fn kind(&self) -> &'static str;
}

// ── Store-backed ───────────────────────────────────────────────────

/// Keeps replica counts in the local state store (standalone mode).
#[derive(Clone)]
pub struct StoreWorkloads {
    store: StateStore,
}

impl StoreWorkloads {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }

    fn get(&self, workload: &WorkloadRef) -> Result<i32, WorkloadError> {
        match self.store.get_workload(&workload.table_key()) {
            Ok(Some(record)) => Ok(record.replicas),
            Ok(None) => Err(WorkloadError::NotFound(workload.to_string())),
            Err(e) => Err(WorkloadError::Unavailable(e.to_string())),
        }
    }

    fn set(&self, workload: &WorkloadRef, replicas: i32) -> Result<(), WorkloadError> {
        self.store
            .set_workload_replicas(&workload.table_key(), replicas)
            .map_err(|e| {
                if e.is_not_found() {
                    WorkloadError::NotFound(workload.to_string())
                } else {
                    WorkloadError::Unavailable(e.to_string())
                }
            })
    }
}

impl WorkloadControlPlane for StoreWorkloads {
    fn get_replica_count<'a>(&'a self, workload: &'a WorkloadRef) -> WorkloadFuture<'a, i32> {
        let result = self.get(workload);
        Box::pin(async move { result })
    }

    fn set_replica_count<'a>(
        &'a self,
        workload: &'a WorkloadRef,
        replicas: i32,
    ) -> WorkloadFuture<'a, ()> {
        let result = self.set(workload, replicas);
        Box::pin(async move { result })
    }

    fn kind(&self) -> &'static str {
        "store"
    }
}

// ── HTTP ───────────────────────────────────────────────────────────

/// Response envelope used by the customscaler REST API.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

/// Talks to a remote `/api/v1/workloads/{namespace}/{name}` endpoint.
#[derive(Debug, Clone)]
pub struct HttpWorkloads {
    /// `host:port` of the remote API.
    base: String,
    timeout: Duration,
}

impl HttpWorkloads {
    pub fn new(base: &str, timeout: Duration) -> Self {
        Self {
            base: base.to_string(),
            timeout,
        }
    }

    fn target(&self, workload: &WorkloadRef) -> Result<HttpTarget, WorkloadError> {
        let path = format!("/api/v1/workloads/{}/{}", workload.namespace, workload.name);
        HttpTarget::from_base(&self.base, &path).map_err(|e| WorkloadError::Unavailable(e.to_string()))
    }

    async fn exchange(
        &self,
        method: Method,
        workload: &WorkloadRef,
        body: Option<Vec<u8>>,
    ) -> Result<Option<ReplicaCount>, WorkloadError> {
        let target = self.target(workload)?;
        let response = send(method, &target, body, self.timeout)
            .await
            .map_err(|e| WorkloadError::Unavailable(e.to_string()))?;

        if response.status == StatusCode::NOT_FOUND {
            return Err(WorkloadError::NotFound(workload.to_string()));
        }

        let envelope: Envelope<ReplicaCount> = serde_json::from_slice(&response.body)
            .map_err(|e| {
                WorkloadError::Unavailable(format!("{} with unreadable body: {e}", response.status))
            })?;

        if !response.status.is_success() || !envelope.success {
            return Err(WorkloadError::Unavailable(
                envelope
                    .error
                    .unwrap_or_else(|| format!("unexpected status {}", response.status)),
            ));
        }
        Ok(envelope.data)
    }

    async fn get(&self, workload: &WorkloadRef) -> Result<i32, WorkloadError> {
        let count = self
            .exchange(Method::GET, workload, None)
            .await?
            .ok_or_else(|| WorkloadError::Unavailable("response carried no replica count".to_string()))?;
        debug!(%workload, replicas = count.replicas, "replica count fetched");
        Ok(count.replicas)
    }

    async fn set(&self, workload: &WorkloadRef, replicas: i32) -> Result<(), WorkloadError> {
        let body = serde_json::to_vec(&ReplicaCount { replicas })
            .map_err(|e| WorkloadError::Unavailable(e.to_string()))?;
        self.exchange(Method::PUT, workload, Some(body)).await?;
        debug!(%workload, replicas, "replica count set");
        Ok(())
    }
}

impl WorkloadControlPlane for HttpWorkloads {
    fn get_replica_count<'a>(&'a self, workload: &'a WorkloadRef) -> WorkloadFuture<'a, i32> {
        Box::pin(self.get(workload))
    }

    fn set_replica_count<'a>(
        &'a self,
        workload: &'a WorkloadRef,
        replicas: i32,
    ) -> WorkloadFuture<'a, ()> {
        Box::pin(self.set(workload, replicas))
    }

    fn kind(&self) -> &'static str {
        "http"
    }
}
