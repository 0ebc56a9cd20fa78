//! In-memory hold store, one `RwLock<HashMap>` guarding both the hold
//! rows and the applied-operation-key ledger, mirroring the single-lock
//! simplicity of the in-memory ledger mock.

use crate::{HoldStore, HoldsError};
use async_trait::async_trait;
use authz_types::{AccountId, AuthorizationHold, HoldId, HoldStatus, Money};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

#[derive(Default)]
struct State {
    holds: HashMap<HoldId, AuthorizationHold>,
    applied_keys: HashMap<HoldId, HashSet<String>>,
}

#[derive(Default)]
pub struct InMemoryHoldStore {
    state: RwLock<State>,
}

impl InMemoryHoldStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HoldStore for InMemoryHoldStore {
    async fn insert(&self, hold: AuthorizationHold) -> Result<(), HoldsError> {
        self.state.write().unwrap().holds.insert(hold.hold_id, hold);
        Ok(())
    }

    async fn get(&self, hold_id: HoldId) -> Result<AuthorizationHold, HoldsError> {
        self.state
            .read()
            .unwrap()
            .holds
            .get(&hold_id)
            .cloned()
            .ok_or(HoldsError::NotFound)
    }

    async fn operation_already_applied(&self, hold_id: HoldId, operation_key: &str) -> Result<bool, HoldsError> {
        Ok(self
            .state
            .read()
            .unwrap()
            .applied_keys
            .get(&hold_id)
            .map(|keys| keys.contains(operation_key))
            .unwrap_or(false))
    }

    async fn capture(
        &self,
        hold_id: HoldId,
        capture_amount: Money,
        operation_key: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationHold, HoldsError> {
        let mut state = self.state.write().unwrap();
        let hold = state.holds.get_mut(&hold_id).ok_or(HoldsError::NotFound)?;
        if hold.status != HoldStatus::Active {
            return Err(HoldsError::InvalidState);
        }
        hold.status = HoldStatus::Captured;
        hold.captured_amount = capture_amount;
        hold.captured_at = Some(now);
        hold.updated_at = now;
        let result = hold.clone();
        if let Some(key) = operation_key {
            state.applied_keys.entry(hold_id).or_default().insert(key.to_string());
        }
        Ok(result)
    }

    async fn release(
        &self,
        hold_id: HoldId,
        operation_key: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationHold, HoldsError> {
        let mut state = self.state.write().unwrap();
        let hold = state.holds.get_mut(&hold_id).ok_or(HoldsError::NotFound)?;
        if hold.status != HoldStatus::Active {
            return Err(HoldsError::InvalidState);
        }
        hold.status = HoldStatus::Released;
        hold.updated_at = now;
        let result = hold.clone();
        if let Some(key) = operation_key {
            state.applied_keys.entry(hold_id).or_default().insert(key.to_string());
        }
        Ok(result)
    }

    async fn expire(&self, hold_id: HoldId, now: DateTime<Utc>) -> Result<AuthorizationHold, HoldsError> {
        let mut state = self.state.write().unwrap();
        let hold = state.holds.get_mut(&hold_id).ok_or(HoldsError::NotFound)?;
        if hold.status != HoldStatus::Active {
            return Ok(hold.clone());
        }
        hold.status = HoldStatus::Expired;
        hold.updated_at = now;
        Ok(hold.clone())
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<AuthorizationHold>, HoldsError> {
        Ok(self
            .state
            .read()
            .unwrap()
            .holds
            .values()
            .filter(|h| h.status == HoldStatus::Active && h.expires_at < now)
            .cloned()
            .collect())
    }

    async fn list_by_account(
        &self,
        account_id: AccountId,
        status: Option<HoldStatus>,
    ) -> Result<Vec<AuthorizationHold>, HoldsError> {
        Ok(self
            .state
            .read()
            .unwrap()
            .holds
            .values()
            .filter(|h| h.account_id == account_id && status.map(|s| s == h.status).unwrap_or(true))
            .cloned()
            .collect())
    }
}
