//! In-memory spending-window store for tests and the reference
//! deployment's demo mode.

use crate::{LimitsError, SpendingWindowStore};
use async_trait::async_trait;
use authz_types::{
    period_start_for, AccountId, CardId, Money, RequestId, SpendingWindow, SpendingWindowId, WindowScope, WindowType,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

#[derive(Default)]
struct State {
    windows: HashMap<(CardId, WindowType, WindowScope, NaiveDate), SpendingWindowId>,
    by_id: HashMap<SpendingWindowId, SpendingWindow>,
    applied: HashMap<SpendingWindowId, HashSet<(RequestId, bool)>>,
}

#[derive(Default)]
pub struct InMemorySpendingWindowStore {
    state: RwLock<State>,
}

impl InMemorySpendingWindowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SpendingWindowStore for InMemorySpendingWindowStore {
    async fn get_or_create(
        &self,
        card_id: CardId,
        account_id: AccountId,
        window_type: WindowType,
        scope: WindowScope,
        period_start: NaiveDate,
        limit_amount: Money,
        now: DateTime<Utc>,
    ) -> Result<SpendingWindow, LimitsError> {
        let key = (card_id, window_type, scope.clone(), period_start_for(window_type, period_start));
        let mut state = self.state.write().unwrap();
        if let Some(id) = state.windows.get(&key) {
            return Ok(state.by_id.get(id).cloned().expect("indexed window must exist"));
        }
        let window = SpendingWindow {
            window_id: SpendingWindowId::new(),
            card_id,
            account_id,
            window_type,
            period_start: key.3,
            scope,
            limit_amount,
            spent_amount: Money::zero(limit_amount.currency()),
            transaction_count: 0,
            last_transaction_time: None,
            updated_at: now,
        };
        state.windows.insert(key, window.window_id);
        state.by_id.insert(window.window_id, window.clone());
        Ok(window)
    }

    async fn apply_delta(
        &self,
        window_id: SpendingWindowId,
        request_id: RequestId,
        amount: Money,
        reverse: bool,
        now: DateTime<Utc>,
    ) -> Result<SpendingWindow, LimitsError> {
        let mut state = self.state.write().unwrap();
        let already_applied = state.applied.entry(window_id).or_default().contains(&(request_id, reverse));
        let window = state
            .by_id
            .get_mut(&window_id)
            .ok_or_else(|| LimitsError::StoreUnavailable(format!("unknown window {window_id}")))?;
        if already_applied {
            return Ok(window.clone());
        }
        if reverse {
            window.decrease(amount, now);
        } else {
            window.increase(amount, now);
        }
        state.applied.entry(window_id).or_default().insert((request_id, reverse));
        Ok(state.by_id.get(&window_id).cloned().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authz_types::Currency;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn get_or_create_materializes_once() {
        let store = InMemorySpendingWindowStore::new();
        let card_id = CardId::new();
        let account_id = AccountId::new();
        let period = NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();
        let limit = Money::new(dec!(5000.00), Currency::USD);
        let w1 = store
            .get_or_create(card_id, account_id, WindowType::Daily, WindowScope::default(), period, limit, Utc::now())
            .await
            .unwrap();
        let w2 = store
            .get_or_create(card_id, account_id, WindowType::Daily, WindowScope::default(), period, limit, Utc::now())
            .await
            .unwrap();
        assert_eq!(w1.window_id, w2.window_id);
    }

    #[tokio::test]
    async fn apply_delta_is_idempotent_per_request_id() {
        let store = InMemorySpendingWindowStore::new();
        let card_id = CardId::new();
        let account_id = AccountId::new();
        let period = NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();
        let limit = Money::new(dec!(5000.00), Currency::USD);
        let window = store
            .get_or_create(card_id, account_id, WindowType::Daily, WindowScope::default(), period, limit, Utc::now())
            .await
            .unwrap();
        let request_id = RequestId::new();
        let amount = Money::new(dec!(100.00), Currency::USD);
        let after_first = store
            .apply_delta(window.window_id, request_id, amount, false, Utc::now())
            .await
            .unwrap();
        let after_second = store
            .apply_delta(window.window_id, request_id, amount, false, Utc::now())
            .await
            .unwrap();
        assert_eq!(after_first.spent_amount, after_second.spent_amount);
        assert_eq!(after_second.spent_amount.amount(), dec!(100.00));
    }

    #[tokio::test]
    async fn apply_delta_reversal_decrements_even_with_the_original_request_id() {
        let store = InMemorySpendingWindowStore::new();
        let card_id = CardId::new();
        let account_id = AccountId::new();
        let period = NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();
        let limit = Money::new(dec!(5000.00), Currency::USD);
        let window = store
            .get_or_create(card_id, account_id, WindowType::Daily, WindowScope::default(), period, limit, Utc::now())
            .await
            .unwrap();
        let request_id = RequestId::new();
        let amount = Money::new(dec!(100.00), Currency::USD);
        store.apply_delta(window.window_id, request_id, amount, false, Utc::now()).await.unwrap();

        // A reversal of the same request reuses its requestId - it must not
        // be swallowed as a duplicate of the forward commit.
        let after_reversal =
            store.apply_delta(window.window_id, request_id, amount, true, Utc::now()).await.unwrap();
        assert_eq!(after_reversal.spent_amount.amount(), dec!(0.00));

        let after_repeat_reversal =
            store.apply_delta(window.window_id, request_id, amount, true, Utc::now()).await.unwrap();
        assert_eq!(after_repeat_reversal.spent_amount.amount(), dec!(0.00));
    }
}
