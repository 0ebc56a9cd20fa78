//! Liveness/readiness probes: `/health` always reports healthy once the
//! process is up, `/ready` additionally probes the request store.

use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub database: ComponentStatus,
}

#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn readiness_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ReadinessResponse>) {
    let healthy = state.requests.find_by_id(authz_types::RequestId::from(0)).await.is_ok();
    let database = if healthy {
        ComponentStatus {
            name: "requests store".to_string(),
            status: "healthy".to_string(),
            error: None,
        }
    } else {
        ComponentStatus {
            name: "requests store".to_string(),
            status: "unhealthy".to_string(),
            error: Some("request store probe failed".to_string()),
        }
    };
    let status = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (
        status,
        Json(ReadinessResponse {
            status: if healthy { "ready" } else { "not_ready" }.to_string(),
            database,
        }),
    )
}
