//! In-memory request/decision stores for tests and the reference
//! deployment's demo mode, mirroring the single-`RwLock<HashMap>` shape
//! of the other mock stores in this workspace.

use crate::error::{DbError, DbResult};
use crate::repos::{DecisionStore, RequestStore};
use async_trait::async_trait;
use authz_types::{AuthorizationDecision, AuthorizationRequest, DecisionId, RequestId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct InMemoryRequestStore {
    requests: RwLock<HashMap<RequestId, AuthorizationRequest>>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn insert(&self, request: &AuthorizationRequest) -> DbResult<()> {
        let mut requests = self.requests.write().unwrap();
        requests.entry(request.request_id).or_insert_with(|| request.clone());
        Ok(())
    }

    async fn find_by_id(&self, request_id: RequestId) -> DbResult<Option<AuthorizationRequest>> {
        Ok(self.requests.read().unwrap().get(&request_id).cloned())
    }

    async fn mark_processed(&self, request_id: RequestId, now: DateTime<Utc>) -> DbResult<()> {
        let mut requests = self.requests.write().unwrap();
        let request = requests
            .get_mut(&request_id)
            .ok_or_else(|| DbError::NotFound(format!("request {request_id}")))?;
        request.processed = true;
        request.processed_at = Some(now);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryDecisionStore {
    decisions: RwLock<HashMap<DecisionId, AuthorizationDecision>>,
    by_request: RwLock<HashMap<RequestId, DecisionId>>,
}

impl InMemoryDecisionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DecisionStore for InMemoryDecisionStore {
    async fn insert(&self, decision: &AuthorizationDecision) -> DbResult<()> {
        let mut by_request = self.by_request.write().unwrap();
        if by_request.contains_key(&decision.request_id) {
            return Err(DbError::NotFound(format!(
                "decision for request {} already exists",
                decision.request_id
            )));
        }
        by_request.insert(decision.request_id, decision.decision_id);
        self.decisions.write().unwrap().insert(decision.decision_id, decision.clone());
        Ok(())
    }

    async fn find_by_id(&self, decision_id: DecisionId) -> DbResult<Option<AuthorizationDecision>> {
        Ok(self.decisions.read().unwrap().get(&decision_id).cloned())
    }

    async fn find_by_request_id(&self, request_id: RequestId) -> DbResult<Option<AuthorizationDecision>> {
        let by_request = self.by_request.read().unwrap();
        let Some(decision_id) = by_request.get(&request_id) else {
            return Ok(None);
        };
        Ok(self.decisions.read().unwrap().get(decision_id).cloned())
    }

    async fn update(&self, decision: &AuthorizationDecision) -> DbResult<()> {
        let mut decisions = self.decisions.write().unwrap();
        if !decisions.contains_key(&decision.decision_id) {
            return Err(DbError::NotFound(format!("decision {}", decision.decision_id)));
        }
        decisions.insert(decision.decision_id, decision.clone());
        Ok(())
    }
}
