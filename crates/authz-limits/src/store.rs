//! The spending-window persistence contract. Kept separate from the
//! evaluator logic so a Postgres-backed implementation can be swapped in
//! without the evaluator noticing (mirrors the ledger/card-directory
//! split in the external collaborators).

use crate::LimitsError;
use async_trait::async_trait;
use authz_types::{AccountId, CardId, Money, RequestId, SpendingWindow, WindowScope, WindowType};
use chrono::{DateTime, NaiveDate, Utc};

#[async_trait]
pub trait SpendingWindowStore: Send + Sync {
    /// Returns the window for `(card_id, window_type, scope, period_start)`,
    /// materializing it with `limit_amount` and zero spend if it does not
    /// exist yet.
    async fn get_or_create(
        &self,
        card_id: CardId,
        account_id: AccountId,
        window_type: WindowType,
        scope: WindowScope,
        period_start: NaiveDate,
        limit_amount: Money,
        now: DateTime<Utc>,
    ) -> Result<SpendingWindow, LimitsError>;

    /// Applies `amount` to the named window's `spentAmount` (or its
    /// inverse when `reverse` is true), tagged with the `requestId` that
    /// caused it. A second call with a `requestId` already recorded for
    /// this window is a no-op that returns the window unchanged - commits
    /// must be idempotent per requestId.
    async fn apply_delta(
        &self,
        window_id: authz_types::SpendingWindowId,
        request_id: RequestId,
        amount: Money,
        reverse: bool,
        now: DateTime<Utc>,
    ) -> Result<SpendingWindow, LimitsError>;
}
