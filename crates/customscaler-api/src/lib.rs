//! customscaler-api: REST API for customscaler.
//!
//! Exposes scaling policies, their status and events, and the store-backed
//! workloads the standalone control plane scales.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/healthz` | Liveness |
//! | GET | `/api/v1/policies` | List policy records |
//! | POST | `/api/v1/policies` | Create or replace a policy |
//! | GET | `/api/v1/policies/{namespace}/{name}` | Policy record with status |
//! | DELETE | `/api/v1/policies/{namespace}/{name}` | Delete a policy |
//! | GET | `/api/v1/policies/{namespace}/{name}/events` | Recent events (`?limit=N`) |
//! | GET | `/api/v1/workloads` | List workloads |
//! | POST | `/api/v1/workloads` | Create or replace a workload |
//! | GET | `/api/v1/workloads/{namespace}/{name}` | Replica count |
//! | PUT | `/api/v1/workloads/{namespace}/{name}` | Set replica count |

pub mod handlers;

use axum::Router;
use axum::routing::get;
use customscaler_state::StateStore;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: StateStore,
}

/// Build the complete API router.
pub fn build_router(store: StateStore) -> Router {
    let api_state = ApiState { store };

    let api_routes = Router::new()
        .route("/policies", get(handlers::list_policies).post(handlers::apply_policy))
        .route(
            "/policies/{namespace}/{name}",
            get(handlers::get_policy).delete(handlers::delete_policy),
        )
        .route("/policies/{namespace}/{name}/events", get(handlers::list_events))
        .route("/workloads", get(handlers::list_workloads).post(handlers::apply_workload))
        .route(
            "/workloads/{namespace}/{name}",
            get(handlers::get_replicas).put(handlers::set_replicas),
        )
        .with_state(api_state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/healthz", get(handlers::healthz))
}
