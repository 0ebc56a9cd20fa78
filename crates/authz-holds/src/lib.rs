//! Hold Manager (C11): the ACTIVE/CAPTURED/RELEASED/EXPIRED state
//! machine that backs every approval, with each status transition
//! guarded the same way a ledger-backed withdrawal lifecycle is.
//!
//! Every operation is serialized per `holdId` via [`authz_core::KeyedLock`],
//! and the ledger move plus the status mutation are treated as one
//! logical transaction: if the ledger call fails, the store is never
//! touched, so a hold can only ever be left ACTIVE and safe to retry. If
//! the ledger call succeeds but the store update fails, `release`/
//! `expire_one` re-reserve the funds they just released so the account
//! doesn't end up under-reserved against a hold the store still has as
//! ACTIVE; `capture`'s permanent debit has no such inverse, so that case
//! is logged for reconciliation instead.

pub mod config;
pub mod error;
pub mod mock;
pub mod store;

pub use config::HoldsConfig;
pub use error::HoldsError;
pub use mock::InMemoryHoldStore;
pub use store::HoldStore;

use authz_core::KeyedLock;
use authz_ledger::Ledger;
use authz_types::{
    AccountId, AccountSpaceId, AuthorizationHold, CardId, DecisionId, HoldFxOrigin, HoldId, HoldStatus, MerchantId,
    Money, RequestId,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct HoldManager {
    store: Arc<dyn HoldStore>,
    ledger: Arc<dyn Ledger>,
    config: HoldsConfig,
    locks: KeyedLock<HoldId>,
}

impl HoldManager {
    pub fn new(store: Arc<dyn HoldStore>, ledger: Arc<dyn Ledger>, config: HoldsConfig) -> Self {
        Self {
            store,
            ledger,
            config,
            locks: KeyedLock::new(),
        }
    }

    /// Reserve funds and persist a new ACTIVE hold. Called only on the
    /// APPROVED/PARTIAL path, after the balance check has already
    /// confirmed headroom exists; a ledger-reported shortfall here still
    /// fails the whole authorization with `INSUFFICIENT_FUNDS` and leaves
    /// no hold row behind.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        request_id: RequestId,
        decision_id: DecisionId,
        account_id: AccountId,
        account_space_id: Option<AccountSpaceId>,
        card_id: CardId,
        merchant_id: MerchantId,
        merchant_name: String,
        amount: Money,
        fx_origin: Option<HoldFxOrigin>,
        authorization_code: String,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationHold, HoldsError> {
        self.ledger.reserve(account_id, amount, request_id).await?;

        let hold = AuthorizationHold {
            hold_id: HoldId::new(),
            request_id,
            decision_id,
            account_id,
            account_space_id,
            card_id,
            merchant_id,
            merchant_name,
            amount,
            fx_origin,
            authorization_code,
            status: HoldStatus::Active,
            captured_amount: Money::zero(amount.currency()),
            created_at: now,
            updated_at: now,
            captured_at: None,
            expires_at: now + self.config.hold_ttl,
        };

        if let Err(err) = self.store.insert(hold.clone()).await {
            // Ledger reserve already succeeded; compensate before surfacing
            // the failure so no hold is left in limbo.
            let _ = self.ledger.release(account_id, amount, request_id).await;
            return Err(err);
        }
        Ok(hold)
    }

    /// ACTIVE -> CAPTURED, full or partial. `operation_key`, when given,
    /// makes a repeated call for a hold already resolved by that key a
    /// no-op that returns the current row.
    pub async fn capture(
        &self,
        hold_id: HoldId,
        capture_amount: Money,
        operation_key: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationHold, HoldsError> {
        let _guard = self.locks.lock(hold_id).await;

        if let Some(key) = operation_key {
            if self.store.operation_already_applied(hold_id, key).await? {
                return self.store.get(hold_id).await;
            }
        }

        let hold = self.store.get(hold_id).await?;
        if hold.status != HoldStatus::Active {
            return Err(HoldsError::InvalidState);
        }
        if capture_amount.is_zero() || capture_amount.amount() > hold.amount.amount() || capture_amount.currency() != hold.amount.currency() {
            return Err(HoldsError::InvalidAmount);
        }

        let remainder = hold.amount.checked_sub(capture_amount).ok_or(HoldsError::InvalidAmount)?;

        // Post the captured portion: debits the ledger balance and clears
        // that much from the reserved bucket.
        self.ledger.post(hold.account_id, capture_amount, hold.request_id).await?;
        if remainder.is_positive() {
            // Partial capture: the unused remainder goes back to available
            // without a debit. The capture itself already posted, so a
            // failure here must not silently leave the hold ACTIVE with no
            // record of the successful debit - log it the same way the
            // store-update failure below does, since a retry would debit
            // the account a second time.
            if let Err(err) = self.ledger.release(hold.account_id, remainder, hold.request_id).await {
                tracing::error!(
                    %hold_id,
                    amount = %capture_amount.amount(),
                    error = %err,
                    "capture posted to the ledger but releasing the remainder failed; hold remains ACTIVE against a debited account, needs reconciliation"
                );
                return Err(err.into());
            }
        }

        match self.store.capture(hold_id, capture_amount, operation_key, now).await {
            Ok(captured) => Ok(captured),
            Err(err) => {
                // The remainder's release is reversible (re-reserve it), but
                // `post` is a permanent debit with no inverse move on the
                // `Ledger` trait - the hold row stays ACTIVE while those
                // funds are already gone from the account, which needs
                // manual reconciliation. Surfacing that loudly is the best
                // this layer can do; re-running `capture` with the same
                // `operation_key` after the store recovers is still safe
                // (`operation_already_applied` short-circuits it).
                if remainder.is_positive() {
                    let _ = self.ledger.reserve(hold.account_id, remainder, hold.request_id).await;
                }
                tracing::error!(
                    %hold_id,
                    amount = %capture_amount.amount(),
                    error = %err,
                    "capture posted to the ledger but the store update failed; hold remains ACTIVE against a debited account, needs reconciliation"
                );
                Err(err)
            }
        }
    }

    /// ACTIVE -> RELEASED. Idempotent beyond the operation-key check: a
    /// hold that already transitioned to RELEASED or EXPIRED is returned
    /// as-is (L3 - release after expire, and vice versa, is a no-op). A
    /// hold already CAPTURED cannot be released (funds are already
    /// debited) and is a hard `INVALID_STATE`.
    pub async fn release(
        &self,
        hold_id: HoldId,
        operation_key: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationHold, HoldsError> {
        let _guard = self.locks.lock(hold_id).await;

        if let Some(key) = operation_key {
            if self.store.operation_already_applied(hold_id, key).await? {
                return self.store.get(hold_id).await;
            }
        }

        let hold = self.store.get(hold_id).await?;
        match hold.status {
            HoldStatus::Active => {
                self.ledger.release(hold.account_id, hold.amount, hold.request_id).await?;
                match self.store.release(hold_id, operation_key, now).await {
                    Ok(released) => Ok(released),
                    Err(err) => {
                        // Ledger release already succeeded; re-reserve so the
                        // account doesn't end up with fewer reserved funds
                        // than an ACTIVE hold (P2) while the store still
                        // thinks it's ACTIVE.
                        let _ = self.ledger.reserve(hold.account_id, hold.amount, hold.request_id).await;
                        tracing::error!(%hold_id, error = %err, "hold release failed to persist after the ledger release; re-reserved funds");
                        Err(err)
                    }
                }
            }
            HoldStatus::Released | HoldStatus::Expired => Ok(hold),
            HoldStatus::Captured => Err(HoldsError::InvalidState),
        }
    }

    /// Drives one ACTIVE hold to EXPIRED, same ledger move as release.
    /// A no-op if the hold already left ACTIVE by the time the lock is
    /// acquired - the sweeper's per-hold isolation relies on this never
    /// erroring out on a stale listing.
    pub async fn expire_one(&self, hold_id: HoldId, now: DateTime<Utc>) -> Result<AuthorizationHold, HoldsError> {
        let _guard = self.locks.lock(hold_id).await;

        let hold = self.store.get(hold_id).await?;
        if hold.status != HoldStatus::Active {
            return Ok(hold);
        }
        self.ledger.release(hold.account_id, hold.amount, hold.request_id).await?;
        match self.store.expire(hold_id, now).await {
            Ok(expired) => Ok(expired),
            Err(err) => {
                let _ = self.ledger.reserve(hold.account_id, hold.amount, hold.request_id).await;
                tracing::error!(%hold_id, error = %err, "hold expiry failed to persist after the ledger release; re-reserved funds");
                Err(err)
            }
        }
    }

    /// Lists every hold past its expiry and expires each independently,
    /// collecting per-hold results so a failure on one never blocks the
    /// rest.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<Vec<(HoldId, Result<(), HoldsError>)>, HoldsError> {
        let candidates = self.store.list_expired(now).await?;
        let mut results = Vec::with_capacity(candidates.len());
        for hold in candidates {
            let outcome = self.expire_one(hold.hold_id, now).await.map(|_| ());
            results.push((hold.hold_id, outcome));
        }
        Ok(results)
    }

    pub async fn get(&self, hold_id: HoldId) -> Result<AuthorizationHold, HoldsError> {
        self.store.get(hold_id).await
    }

    pub async fn list_by_account(
        &self,
        account_id: AccountId,
        status: Option<HoldStatus>,
    ) -> Result<Vec<AuthorizationHold>, HoldsError> {
        self.store.list_by_account(account_id, status).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authz_ledger::InMemoryLedger;
    use authz_types::Currency;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Wraps a real store and fails the next `release` call exactly once,
    /// so tests can exercise the re-reserve compensation path without a
    /// dedicated fault-injection store per scenario.
    struct FlakyOnceStore {
        inner: InMemoryHoldStore,
        fail_next_release: AtomicBool,
    }

    impl FlakyOnceStore {
        fn new() -> Self {
            Self {
                inner: InMemoryHoldStore::new(),
                fail_next_release: AtomicBool::new(false),
            }
        }

        fn arm_release_failure(&self) {
            self.fail_next_release.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl HoldStore for FlakyOnceStore {
        async fn insert(&self, hold: AuthorizationHold) -> Result<(), HoldsError> {
            self.inner.insert(hold).await
        }
        async fn get(&self, hold_id: HoldId) -> Result<AuthorizationHold, HoldsError> {
            self.inner.get(hold_id).await
        }
        async fn operation_already_applied(&self, hold_id: HoldId, operation_key: &str) -> Result<bool, HoldsError> {
            self.inner.operation_already_applied(hold_id, operation_key).await
        }
        async fn capture(
            &self,
            hold_id: HoldId,
            capture_amount: Money,
            operation_key: Option<&str>,
            now: DateTime<Utc>,
        ) -> Result<AuthorizationHold, HoldsError> {
            self.inner.capture(hold_id, capture_amount, operation_key, now).await
        }
        async fn release(
            &self,
            hold_id: HoldId,
            operation_key: Option<&str>,
            now: DateTime<Utc>,
        ) -> Result<AuthorizationHold, HoldsError> {
            if self.fail_next_release.swap(false, Ordering::SeqCst) {
                return Err(HoldsError::Store("simulated store outage".to_string()));
            }
            self.inner.release(hold_id, operation_key, now).await
        }
        async fn expire(&self, hold_id: HoldId, now: DateTime<Utc>) -> Result<AuthorizationHold, HoldsError> {
            self.inner.expire(hold_id, now).await
        }
        async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<AuthorizationHold>, HoldsError> {
            self.inner.list_expired(now).await
        }
        async fn list_by_account(
            &self,
            account_id: AccountId,
            status: Option<HoldStatus>,
        ) -> Result<Vec<AuthorizationHold>, HoldsError> {
            self.inner.list_by_account(account_id, status).await
        }
    }

    fn hold_manager() -> (HoldManager, Arc<InMemoryLedger>, AccountId) {
        let ledger = Arc::new(InMemoryLedger::new());
        let store = Arc::new(InMemoryHoldStore::new());
        let manager = HoldManager::new(store, ledger.clone(), HoldsConfig::default());
        (manager, ledger, AccountId::new())
    }

    async fn seeded(amount: rust_decimal::Decimal) -> (HoldManager, Arc<InMemoryLedger>, AccountId) {
        let (manager, ledger, account) = hold_manager();
        ledger.seed(account, Money::new(amount, Currency::USD)).await;
        (manager, ledger, account)
    }

    #[tokio::test]
    async fn create_reserves_and_persists_active_hold() {
        let (manager, ledger, account) = seeded(dec!(200.00)).await;
        let now = Utc::now();
        let hold = manager
            .create(
                RequestId::new(),
                DecisionId::new(),
                account,
                None,
                CardId::new(),
                MerchantId::new(),
                "Acme".to_string(),
                Money::new(dec!(125.50), Currency::USD),
                None,
                "123456".to_string(),
                now,
            )
            .await
            .unwrap();
        assert_eq!(hold.status, HoldStatus::Active);
        let balances = ledger.balances(account).await.unwrap();
        assert_eq!(balances.reserved.amount(), dec!(125.50));
    }

    #[tokio::test]
    async fn full_capture_posts_without_releasing_remainder() {
        let (manager, ledger, account) = seeded(dec!(200.00)).await;
        let now = Utc::now();
        let hold = manager
            .create(
                RequestId::new(),
                DecisionId::new(),
                account,
                None,
                CardId::new(),
                MerchantId::new(),
                "Acme".to_string(),
                Money::new(dec!(100.00), Currency::USD),
                None,
                "123456".to_string(),
                now,
            )
            .await
            .unwrap();

        let captured = manager
            .capture(hold.hold_id, Money::new(dec!(100.00), Currency::USD), None, now)
            .await
            .unwrap();
        assert_eq!(captured.status, HoldStatus::Captured);
        assert_eq!(captured.captured_amount.amount(), dec!(100.00));

        let balances = ledger.balances(account).await.unwrap();
        assert_eq!(balances.reserved.amount(), dec!(0.00));
        assert_eq!(balances.ledger_balance.amount(), dec!(100.00));
    }

    #[tokio::test]
    async fn partial_capture_releases_the_unused_remainder() {
        let (manager, ledger, account) = seeded(dec!(200.00)).await;
        let now = Utc::now();
        let hold = manager
            .create(
                RequestId::new(),
                DecisionId::new(),
                account,
                None,
                CardId::new(),
                MerchantId::new(),
                "Acme".to_string(),
                Money::new(dec!(100.00), Currency::USD),
                None,
                "123456".to_string(),
                now,
            )
            .await
            .unwrap();

        let captured = manager
            .capture(hold.hold_id, Money::new(dec!(75.00), Currency::USD), None, now)
            .await
            .unwrap();
        assert_eq!(captured.captured_amount.amount(), dec!(75.00));

        let balances = ledger.balances(account).await.unwrap();
        assert_eq!(balances.reserved.amount(), dec!(0.00));
        assert_eq!(balances.ledger_balance.amount(), dec!(125.00));
    }

    #[tokio::test]
    async fn release_restores_availability() {
        let (manager, ledger, account) = seeded(dec!(200.00)).await;
        let now = Utc::now();
        let hold = manager
            .create(
                RequestId::new(),
                DecisionId::new(),
                account,
                None,
                CardId::new(),
                MerchantId::new(),
                "Acme".to_string(),
                Money::new(dec!(100.00), Currency::USD),
                None,
                "123456".to_string(),
                now,
            )
            .await
            .unwrap();

        let released = manager.release(hold.hold_id, None, now).await.unwrap();
        assert_eq!(released.status, HoldStatus::Released);
        let balances = ledger.balances(account).await.unwrap();
        assert_eq!(balances.available().amount(), dec!(200.00));
    }

    #[tokio::test]
    async fn release_re_reserves_the_amount_if_the_store_update_fails() {
        let ledger = Arc::new(InMemoryLedger::new());
        let account = AccountId::new();
        ledger.seed(account, Money::new(dec!(200.00), Currency::USD)).await;
        let store = Arc::new(FlakyOnceStore::new());
        let manager = HoldManager::new(store.clone(), ledger.clone(), HoldsConfig::default());

        let now = Utc::now();
        let hold = manager
            .create(
                RequestId::new(),
                DecisionId::new(),
                account,
                None,
                CardId::new(),
                MerchantId::new(),
                "Acme".to_string(),
                Money::new(dec!(100.00), Currency::USD),
                None,
                "123456".to_string(),
                now,
            )
            .await
            .unwrap();

        store.arm_release_failure();
        let result = manager.release(hold.hold_id, None, now).await;
        assert!(matches!(result, Err(HoldsError::Store(_))));

        // The store-side release never landed, so the hold is still
        // ACTIVE - and since the ledger release was compensated, its
        // funds are still reserved rather than leaked back to available.
        let still_active = manager.get(hold.hold_id).await.unwrap();
        assert_eq!(still_active.status, HoldStatus::Active);
        let balances = ledger.balances(account).await.unwrap();
        assert_eq!(balances.reserved.amount(), dec!(100.00));

        let released = manager.release(hold.hold_id, None, now).await.unwrap();
        assert_eq!(released.status, HoldStatus::Released);
        let balances = ledger.balances(account).await.unwrap();
        assert_eq!(balances.available().amount(), dec!(200.00));
    }

    #[tokio::test]
    async fn release_after_expire_is_a_no_op() {
        let (manager, _ledger, account) = seeded(dec!(200.00)).await;
        let now = Utc::now();
        let hold = manager
            .create(
                RequestId::new(),
                DecisionId::new(),
                account,
                None,
                CardId::new(),
                MerchantId::new(),
                "Acme".to_string(),
                Money::new(dec!(100.00), Currency::USD),
                None,
                "123456".to_string(),
                now,
            )
            .await
            .unwrap();

        let expired = manager.expire_one(hold.hold_id, now + chrono::Duration::days(8)).await.unwrap();
        assert_eq!(expired.status, HoldStatus::Expired);

        let released_again = manager.release(hold.hold_id, None, now).await.unwrap();
        assert_eq!(released_again.status, HoldStatus::Expired);
    }

    #[tokio::test]
    async fn capture_of_non_active_hold_is_invalid_state() {
        let (manager, _ledger, account) = seeded(dec!(200.00)).await;
        let now = Utc::now();
        let hold = manager
            .create(
                RequestId::new(),
                DecisionId::new(),
                account,
                None,
                CardId::new(),
                MerchantId::new(),
                "Acme".to_string(),
                Money::new(dec!(100.00), Currency::USD),
                None,
                "123456".to_string(),
                now,
            )
            .await
            .unwrap();
        manager.release(hold.hold_id, None, now).await.unwrap();

        let result = manager.capture(hold.hold_id, Money::new(dec!(50.00), Currency::USD), None, now).await;
        assert!(matches!(result, Err(HoldsError::InvalidState)));
    }

    #[tokio::test]
    async fn capture_idempotent_under_same_operation_key() {
        let (manager, _ledger, account) = seeded(dec!(200.00)).await;
        let now = Utc::now();
        let hold = manager
            .create(
                RequestId::new(),
                DecisionId::new(),
                account,
                None,
                CardId::new(),
                MerchantId::new(),
                "Acme".to_string(),
                Money::new(dec!(100.00), Currency::USD),
                None,
                "123456".to_string(),
                now,
            )
            .await
            .unwrap();

        let first = manager
            .capture(hold.hold_id, Money::new(dec!(40.00), Currency::USD), Some("op-1"), now)
            .await
            .unwrap();
        let second = manager
            .capture(hold.hold_id, Money::new(dec!(40.00), Currency::USD), Some("op-1"), now)
            .await
            .unwrap();
        assert_eq!(first.captured_amount, second.captured_amount);
    }

    #[tokio::test]
    async fn sweep_expires_only_past_due_holds_and_isolates_each() {
        let (manager, ledger, account) = seeded(dec!(500.00)).await;
        let now = Utc::now();
        let expired_hold = manager
            .create(
                RequestId::new(),
                DecisionId::new(),
                account,
                None,
                CardId::new(),
                MerchantId::new(),
                "Acme".to_string(),
                Money::new(dec!(100.00), Currency::USD),
                None,
                "123456".to_string(),
                now - chrono::Duration::days(8),
            )
            .await
            .unwrap();
        let fresh_hold = manager
            .create(
                RequestId::new(),
                DecisionId::new(),
                account,
                None,
                CardId::new(),
                MerchantId::new(),
                "Acme".to_string(),
                Money::new(dec!(50.00), Currency::USD),
                None,
                "654321".to_string(),
                now,
            )
            .await
            .unwrap();

        let results = manager.sweep_expired(now).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, expired_hold.hold_id);
        assert!(results[0].1.is_ok());

        let swept = manager.get(expired_hold.hold_id).await.unwrap();
        assert_eq!(swept.status, HoldStatus::Expired);
        let untouched = manager.get(fresh_hold.hold_id).await.unwrap();
        assert_eq!(untouched.status, HoldStatus::Active);

        let balances = ledger.balances(account).await.unwrap();
        assert_eq!(balances.reserved.amount(), dec!(50.00));
    }
}
