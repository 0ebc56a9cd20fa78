//! Shared application state: the orchestrator plus the collaborators the
//! HTTP handlers need directly but the orchestrator keeps private
//! (request/decision lookups, hold listing/capture/release, and a raw
//! card lookup for reversal/challenge-completion).

use authz_card_directory::CardDirectory;
use authz_db::repos::{DecisionStore, RequestStore};
use authz_holds::HoldManager;
use authz_orchestrator::AuthorizationOrchestrator;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AuthorizationOrchestrator>,
    pub holds: Arc<HoldManager>,
    pub requests: Arc<dyn RequestStore>,
    pub decisions: Arc<dyn DecisionStore>,
    pub card_directory: Arc<dyn CardDirectory>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<AuthorizationOrchestrator>,
        holds: Arc<HoldManager>,
        requests: Arc<dyn RequestStore>,
        decisions: Arc<dyn DecisionStore>,
        card_directory: Arc<dyn CardDirectory>,
    ) -> Self {
        Self {
            orchestrator,
            holds,
            requests,
            decisions,
            card_directory,
        }
    }
}
