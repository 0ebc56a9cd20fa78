//! The hold persistence contract: status-guarded transitions only, no
//! business rules. A Postgres implementation expresses each of these as
//! a single `UPDATE ... WHERE status = 'ACTIVE' RETURNING *` (the same
//! compare-and-swap idiom used for withdrawal approval), which is why
//! these methods take the already-validated new values rather than a
//! mutation closure.

use crate::HoldsError;
use async_trait::async_trait;
use authz_types::{AccountId, AuthorizationHold, HoldId, HoldStatus, Money};
use chrono::{DateTime, Utc};

#[async_trait]
pub trait HoldStore: Send + Sync {
    async fn insert(&self, hold: AuthorizationHold) -> Result<(), HoldsError>;

    async fn get(&self, hold_id: HoldId) -> Result<AuthorizationHold, HoldsError>;

    /// True iff `operation_key` was already recorded as applied to this
    /// hold (i.e. this is a retry of a capture/release the store has
    /// already completed). Checked by the hold manager before touching
    /// the ledger so a retried call never re-applies a ledger move.
    async fn operation_already_applied(&self, hold_id: HoldId, operation_key: &str) -> Result<bool, HoldsError>;

    /// ACTIVE -> CAPTURED. Caller has already validated `capture_amount`
    /// and performed the corresponding ledger moves.
    async fn capture(
        &self,
        hold_id: HoldId,
        capture_amount: Money,
        operation_key: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationHold, HoldsError>;

    /// ACTIVE -> RELEASED.
    async fn release(
        &self,
        hold_id: HoldId,
        operation_key: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationHold, HoldsError>;

    /// ACTIVE -> EXPIRED. Never errors on a hold that is already
    /// terminal; the sweeper's per-hold isolation relies on that (a
    /// stale listing racing a concurrent capture is not a failure).
    async fn expire(&self, hold_id: HoldId, now: DateTime<Utc>) -> Result<AuthorizationHold, HoldsError>;

    /// Holds with status ACTIVE and `expires_at < now`.
    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<AuthorizationHold>, HoldsError>;

    /// Holds for `account_id`, optionally narrowed to one status -
    /// backs `GET /api/v1/holds?accountId=...&status=...`.
    async fn list_by_account(
        &self,
        account_id: AccountId,
        status: Option<HoldStatus>,
    ) -> Result<Vec<AuthorizationHold>, HoldsError>;
}
