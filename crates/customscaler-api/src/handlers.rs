//! REST API handlers.
//!
//! Each handler reads/writes via `StateStore` and returns JSON responses.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::info;

use customscaler_state::*;

use crate::ApiState;

const DEFAULT_EVENT_LIMIT: usize = 50;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

fn internal(e: StateError) -> axum::response::Response {
    error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response()
}

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    ApiResponse::ok("ok")
}

// ── Policies ───────────────────────────────────────────────────

/// GET /api/v1/policies
pub async fn list_policies(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.list_policies() {
        Ok(records) => ApiResponse::ok(records).into_response(),
        Err(e) => internal(e),
    }
}

/// POST /api/v1/policies
///
/// Stored as given; incoherent policies surface later as `ConfigError`
/// events rather than being rejected here.
pub async fn apply_policy(
    State(state): State<ApiState>,
    Json(policy): Json<ScalingPolicy>,
) -> impl IntoResponse {
    if let Err(e) = policy.check_names() {
        return error_response(&e.to_string(), StatusCode::BAD_REQUEST).into_response();
    }
    match state.store.put_policy(&policy) {
        Ok(record) => {
            info!(policy = %record.key(), version = record.resource_version, "policy applied");
            (StatusCode::CREATED, ApiResponse::ok(record)).into_response()
        }
        Err(e) => internal(e),
    }
}

/// GET /api/v1/policies/{namespace}/{name}
pub async fn get_policy(
    State(state): State<ApiState>,
    Path((namespace, name)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.store.get_policy(&object_key(&namespace, &name)) {
        Ok(Some(record)) => ApiResponse::ok(record).into_response(),
        Ok(None) => error_response("policy not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => internal(e),
    }
}

/// DELETE /api/v1/policies/{namespace}/{name}
pub async fn delete_policy(
    State(state): State<ApiState>,
    Path((namespace, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let key = object_key(&namespace, &name);
    match state.store.delete_policy(&key) {
        Ok(true) => {
            info!(policy = %key, "policy deleted");
            ApiResponse::ok("deleted").into_response()
        }
        Ok(false) => error_response("policy not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => internal(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

/// GET /api/v1/policies/{namespace}/{name}/events
pub async fn list_events(
    State(state): State<ApiState>,
    Path((namespace, name)): Path<(String, String)>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    let key = object_key(&namespace, &name);
    let limit = query.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    match state.store.list_events(&key, limit) {
        Ok(events) => ApiResponse::ok(events).into_response(),
        Err(e) => internal(e),
    }
}

// ── Workloads ──────────────────────────────────────────────────

/// GET /api/v1/workloads
pub async fn list_workloads(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.list_workloads() {
        Ok(workloads) => ApiResponse::ok(workloads).into_response(),
        Err(e) => internal(e),
    }
}

/// POST /api/v1/workloads
pub async fn apply_workload(
    State(state): State<ApiState>,
    Json(workload): Json<WorkloadRecord>,
) -> impl IntoResponse {
    if let Err(e) = workload.check_names() {
        return error_response(&e.to_string(), StatusCode::BAD_REQUEST).into_response();
    }
    if workload.replicas < 0 {
        return error_response("replicas must be non-negative", StatusCode::BAD_REQUEST)
            .into_response();
    }
    match state.store.put_workload(&workload) {
        Ok(()) => (StatusCode::CREATED, ApiResponse::ok(workload)).into_response(),
        Err(e) => internal(e),
    }
}

/// GET /api/v1/workloads/{namespace}/{name}
pub async fn get_replicas(
    State(state): State<ApiState>,
    Path((namespace, name)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.store.get_workload(&object_key(&namespace, &name)) {
        Ok(Some(workload)) => ApiResponse::ok(ReplicaCount {
            replicas: workload.replicas,
        })
        .into_response(),
        Ok(None) => error_response("workload not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => internal(e),
    }
}

/// PUT /api/v1/workloads/{namespace}/{name}
pub async fn set_replicas(
    State(state): State<ApiState>,
    Path((namespace, name)): Path<(String, String)>,
    Json(count): Json<ReplicaCount>,
) -> impl IntoResponse {
    if count.replicas < 0 {
        return error_response("replicas must be non-negative", StatusCode::BAD_REQUEST)
            .into_response();
    }
    let key = object_key(&namespace, &name);
    match state.store.set_workload_replicas(&key, count.replicas) {
        Ok(()) => ApiResponse::ok(count).into_response(),
        Err(e) if e.is_not_found() => {
            error_response("workload not found", StatusCode::NOT_FOUND).into_response()
        }
        Err(e) => internal(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> ApiState {
        let store = StateStore::open_in_memory().unwrap();
        ApiState { store }
    }

    fn test_policy() -> ScalingPolicy {
        ScalingPolicy {
            namespace: "default".to_string(),
            name: "web-scaler".to_string(),
            workload_ref: WorkloadRef::new("default", "web"),
            metric_source: "queue_depth".to_string(),
            scale_up_threshold: 80,
            scale_down_threshold: 20,
            cooldown_period_seconds: 60,
            min_replicas: 1,
            max_replicas: 5,
        }
    }

    fn path(namespace: &str, name: &str) -> Path<(String, String)> {
        Path((namespace.to_string(), name.to_string()))
    }

    #[tokio::test]
    async fn apply_then_get_policy() {
        let state = test_state();

        let resp = apply_policy(State(state.clone()), Json(test_policy()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = get_policy(State(state), path("default", "web-scaler"))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn incoherent_policy_is_still_stored() {
        let state = test_state();
        let mut policy = test_policy();
        policy.scale_down_threshold = 95;

        let resp = apply_policy(State(state.clone()), Json(policy))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert!(state.store.get_policy("default/web-scaler").unwrap().is_some());
    }

    #[tokio::test]
    async fn policy_without_name_is_rejected() {
        let state = test_state();
        let mut policy = test_policy();
        policy.name.clear();

        let resp = apply_policy(State(state), Json(policy)).await.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn separator_in_names_is_rejected() {
        let state = test_state();
        let mut policy = test_policy();
        policy.name = "b/c".to_string();
        let resp = apply_policy(State(state.clone()), Json(policy))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let mut policy = test_policy();
        policy.workload_ref.name = "web:x".to_string();
        let resp = apply_policy(State(state.clone()), Json(policy))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = apply_workload(
            State(state.clone()),
            Json(WorkloadRecord {
                namespace: "a/b".to_string(),
                name: "c".to_string(),
                replicas: 1,
            }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        assert!(state.store.list_policies().unwrap().is_empty());
        assert!(state.store.list_workloads().unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_missing_policy() {
        let resp = get_policy(State(test_state()), path("default", "nope"))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_policy_twice() {
        let state = test_state();
        state.store.put_policy(&test_policy()).unwrap();

        let resp = delete_policy(State(state.clone()), path("default", "web-scaler"))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = delete_policy(State(state), path("default", "web-scaler"))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn set_replicas_requires_existing_workload() {
        let state = test_state();

        let resp = set_replicas(
            State(state.clone()),
            path("default", "web"),
            Json(ReplicaCount { replicas: 3 }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        state
            .store
            .put_workload(&WorkloadRecord {
                namespace: "default".to_string(),
                name: "web".to_string(),
                replicas: 1,
            })
            .unwrap();
        let resp = set_replicas(
            State(state.clone()),
            path("default", "web"),
            Json(ReplicaCount { replicas: 3 }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.store.get_workload("default/web").unwrap().unwrap().replicas, 3);
    }

    #[tokio::test]
    async fn negative_replicas_rejected() {
        let resp = set_replicas(
            State(test_state()),
            path("default", "web"),
            Json(ReplicaCount { replicas: -1 }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
