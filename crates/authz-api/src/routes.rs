//! Route wiring for the authorization HTTP surface.

use crate::handlers;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/authorizations", authorization_routes())
        .nest("/holds", hold_routes())
}

fn authorization_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(handlers::authorizations::create_authorization))
        .route("/:decisionId", get(handlers::authorizations::get_decision))
        .route("/request/:requestId", get(handlers::authorizations::get_decision_by_request))
        .route("/:requestId/reverse", post(handlers::authorizations::reverse_authorization))
        .route("/:requestId/challenge-complete", post(handlers::authorizations::challenge_complete))
}

fn hold_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::holds::list_holds))
        .route("/:holdId", get(handlers::holds::get_hold))
        .route("/:holdId/capture", post(handlers::holds::capture_hold))
        .route("/:holdId/release", post(handlers::holds::release_hold))
}
