//! Process wiring: store, backends, controller and API server.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};

use customscaler_autoscale::{ConfigError, validate};
use customscaler_backends::{
    FixedMetricSource, HttpMetricSource, HttpWorkloads, MetricSource, StoreWorkloads,
    WorkloadControlPlane,
};
use customscaler_controller::{Controller, Reconciler};
use customscaler_state::{ScalingPolicy, StateStore};

use crate::config::{DaemonConfig, MetricsBackend, WorkloadBackend, duration_field};

const DB_FILE: &str = "customscaler.redb";

/// Open (or create) the state store under `data_dir`.
pub fn open_store(data_dir: &Path) -> anyhow::Result<StateStore> {
    std::fs::create_dir_all(data_dir)?;
    let db_path = data_dir.join(DB_FILE);
    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");
    Ok(store)
}

/// Apply configured policies and create configured workloads that do not
/// exist yet. Returns `(policies, workloads_created)`.
///
/// Existing workload records keep their replica count so a restart does not
/// undo scaling.
pub fn seed(store: &StateStore, config: &DaemonConfig) -> anyhow::Result<(usize, usize)> {
    let mut created = 0;
    for workload in &config.workloads {
        if store.get_workload(&workload.table_key())?.is_none() {
            store.put_workload(workload)?;
            created += 1;
        }
    }
    for policy in &config.policies {
        store.put_policy(policy)?;
    }
    Ok((config.policies.len(), created))
}

pub fn build_metrics(backend: &MetricsBackend) -> anyhow::Result<Arc<dyn MetricSource>> {
    let source: Arc<dyn MetricSource> = match backend {
        MetricsBackend::Fixed { value, overrides } => {
            Arc::new(FixedMetricSource::new(*value).with_overrides(overrides.clone()))
        }
        MetricsBackend::Http { timeout } => {
            Arc::new(HttpMetricSource::new(duration_field("metrics.timeout", timeout)?))
        }
    };
    Ok(source)
}

pub fn build_workloads(
    backend: &WorkloadBackend,
    store: &StateStore,
    config: &DaemonConfig,
) -> anyhow::Result<Arc<dyn WorkloadControlPlane>> {
    let plane: Arc<dyn WorkloadControlPlane> = match backend {
        WorkloadBackend::Store => Arc::new(StoreWorkloads::new(store.clone())),
        WorkloadBackend::Http { endpoint } => {
            let timeout = duration_field("controller.call_timeout", &config.controller.call_timeout)?;
            Arc::new(HttpWorkloads::new(endpoint, timeout))
        }
    };
    Ok(plane)
}

/// Validate every policy, returning the key and outcome of each.
pub fn check_policies(policies: &[ScalingPolicy]) -> Vec<(String, Result<(), ConfigError>)> {
    policies
        .iter()
        .map(|policy| (policy.table_key(), validate(policy)))
        .collect()
}

/// Run until Ctrl-C.
pub async fn run(config: DaemonConfig) -> anyhow::Result<()> {
    info!("customscaler daemon starting");
    let (reconciler_config, controller_config) = config.controller_configs()?;

    let store = open_store(&config.server.data_dir)?;
    let (policies, workloads) = seed(&store, &config)?;
    info!(policies, workloads_created = workloads, "seed applied");

    for (key, result) in check_policies(&config.policies) {
        if let Err(e) = result {
            warn!(policy = %key, error = %e, "seeded policy is invalid and will not scale");
        }
    }

    let metrics = build_metrics(&config.metrics)?;
    let workload_plane = build_workloads(&config.workload, &store, &config)?;
    info!(
        metrics = metrics.kind(),
        workloads = workload_plane.kind(),
        "backends initialized"
    );

    let reconciler = Reconciler::new(store.clone(), metrics, workload_plane, reconciler_config);
    let controller = Controller::new(reconciler, controller_config);

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let controller_handle = tokio::spawn(controller.run(shutdown_rx));

    // ── API server ─────────────────────────────────────────────

    let router = customscaler_api::build_router(store);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to install Ctrl-C handler");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    controller_handle.await??;
    info!("customscaler daemon stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use customscaler_state::{WorkloadRecord, WorkloadRef};

    fn policy(name: &str, up: i32, down: i32) -> ScalingPolicy {
        ScalingPolicy {
            namespace: "default".to_string(),
            name: name.to_string(),
            workload_ref: WorkloadRef::new("default", "web"),
            metric_source: "queue_depth".to_string(),
            scale_up_threshold: up,
            scale_down_threshold: down,
            cooldown_period_seconds: 60,
            min_replicas: 1,
            max_replicas: 5,
        }
    }

    fn seeded_config() -> DaemonConfig {
        DaemonConfig {
            policies: vec![policy("web-scaler", 80, 20)],
            workloads: vec![WorkloadRecord {
                namespace: "default".to_string(),
                name: "web".to_string(),
                replicas: 2,
            }],
            ..DaemonConfig::default()
        }
    }

    #[test]
    fn seed_keeps_existing_replica_counts() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).unwrap();
        let config = seeded_config();

        assert_eq!(seed(&store, &config).unwrap(), (1, 1));
        store.set_workload_replicas("default/web", 4).unwrap();

        // Second start: policy re-applied, workload left alone.
        assert_eq!(seed(&store, &config).unwrap(), (1, 0));
        assert_eq!(store.get_workload("default/web").unwrap().unwrap().replicas, 4);
        assert_eq!(
            store.get_policy("default/web-scaler").unwrap().unwrap().resource_version,
            2
        );
    }

    #[test]
    fn store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = open_store(dir.path()).unwrap();
            seed(&store, &seeded_config()).unwrap();
        }
        let store = open_store(dir.path()).unwrap();
        assert!(store.get_policy("default/web-scaler").unwrap().is_some());
    }

    #[test]
    fn check_reports_each_policy() {
        let results = check_policies(&[policy("good", 80, 20), policy("inverted", 20, 80)]);
        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_ok());
        assert_eq!(results[1].0, "default/inverted");
        assert!(matches!(
            results[1].1,
            Err(ConfigError::ThresholdsInverted { .. })
        ));
    }

    #[tokio::test]
    async fn fixed_metrics_backend_uses_overrides() {
        let backend = MetricsBackend::Fixed {
            value: 30,
            overrides: [("queue_depth".to_string(), 85)].into_iter().collect(),
        };
        let source = build_metrics(&backend).unwrap();
        assert_eq!(source.kind(), "fixed");
        assert_eq!(source.sample("queue_depth").await, Ok(85));
        assert_eq!(source.sample("other").await, Ok(30));
    }

    #[test]
    fn http_metrics_backend_rejects_bad_timeout() {
        let backend = MetricsBackend::Http {
            timeout: "eventually".to_string(),
        };
        assert!(build_metrics(&backend).is_err());
    }

    #[test]
    fn workload_backend_selection() {
        let store = StateStore::open_in_memory().unwrap();
        let config = DaemonConfig::default();

        let plane = build_workloads(&WorkloadBackend::Store, &store, &config).unwrap();
        assert_eq!(plane.kind(), "store");

        let http = WorkloadBackend::Http {
            endpoint: "127.0.0.1:8443".to_string(),
        };
        let plane = build_workloads(&http, &store, &config).unwrap();
        assert_eq!(plane.kind(), "http");
    }
}
