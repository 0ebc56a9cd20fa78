//! Limit Evaluator (C8): resolves the effective limit tier for a card,
//! applies the channel adjustment, and checks a candidate amount against
//! the transaction/channel/daily/monthly ceilings without committing
//! anything. Committing happens separately, via
//! [`LimitEvaluator::update_spending_counters`], which the orchestrator
//! calls only after a hold has actually been created.

pub mod config;
pub mod error;
pub mod mock;
pub mod store;

pub use config::LimitsConfig;
pub use error::LimitsError;
pub use store::SpendingWindowStore;

use authz_types::{
    AuthorizationRequest, CardDetails, Channel, LimitTier, LimitsSnapshot, Money, RequestId, WindowScope, WindowType,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// The non-committal result of [`LimitEvaluator::check`]: how much
/// headroom remained in each window after a passing check, for inclusion
/// on the decision.
pub type LimitSnapshot = LimitsSnapshot;

pub struct LimitEvaluator {
    store: Arc<dyn SpendingWindowStore>,
    config: LimitsConfig,
}

impl LimitEvaluator {
    pub fn new(store: Arc<dyn SpendingWindowStore>, config: LimitsConfig) -> Self {
        Self { store, config }
    }

    /// Runs the checks in strict order: transaction limit, then
    /// channel-specific caps, then daily, then monthly. Returns on the
    /// first breach.
    pub async fn check(
        &self,
        request: &AuthorizationRequest,
        card: &CardDetails,
        now: DateTime<Utc>,
    ) -> Result<LimitSnapshot, LimitsError> {
        let tier = card.effective_limits().ok_or(LimitsError::NoLimitTier)?;
        let factor = self.config.factor_for(request.channel);

        let effective_transaction_limit = Money::new(tier.transaction_limit.amount() * factor, tier.transaction_limit.currency());
        if request.amount.amount() > effective_transaction_limit.amount() {
            return Err(LimitsError::ExceedsTransactionLimit);
        }

        self.check_channel_cap(request, tier)?;

        let daily_window = self
            .store
            .get_or_create(
                card.card_id,
                card.account_id,
                WindowType::Daily,
                WindowScope::default(),
                request.timestamp.date_naive(),
                Money::new(tier.daily_limit.amount() * factor, tier.daily_limit.currency()),
                now,
            )
            .await?;
        if daily_window
            .spent_amount
            .checked_add(request.amount)
            .map(|total| total.amount() > daily_window.limit_amount.amount())
            .unwrap_or(true)
        {
            return Err(LimitsError::ExceedsDailyLimit);
        }

        let monthly_window = self
            .store
            .get_or_create(
                card.card_id,
                card.account_id,
                WindowType::Monthly,
                WindowScope::default(),
                request.timestamp.date_naive(),
                tier.monthly_limit,
                now,
            )
            .await?;
        if monthly_window
            .spent_amount
            .checked_add(request.amount)
            .map(|total| total.amount() > monthly_window.limit_amount.amount())
            .unwrap_or(true)
        {
            return Err(LimitsError::ExceedsMonthlyLimit);
        }

        Ok(LimitSnapshot {
            transaction_limit: effective_transaction_limit,
            daily_window,
            monthly_window,
        })
    }

    fn check_channel_cap(&self, request: &AuthorizationRequest, tier: &LimitTier) -> Result<(), LimitsError> {
        match request.channel {
            Channel::Atm => {
                if let Some(cap) = tier.atm_daily_limit {
                    if request.amount.amount() > cap.amount() {
                        return Err(LimitsError::ExceedsWithdrawalLimit);
                    }
                }
            }
            Channel::Contactless => {
                if let Some(cap) = tier.contactless_limit {
                    if request.amount.amount() > cap.amount() {
                        return Err(LimitsError::ExceedsContactlessLimit);
                    }
                }
            }
            Channel::ECommerce => {
                if let Some(cap) = tier.online_limit {
                    if request.amount.amount() > cap.amount() {
                        return Err(LimitsError::ExceedsOnlineLimit);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Commits `amount` against the card's daily/monthly windows,
    /// tagged with `request_id`. Idempotent: a repeated call for the
    /// same `(request_id, reverse)` pair against the same window is a
    /// no-op, so a reversal reusing the original commit's `request_id`
    /// still applies - only a true replay of the same direction is
    /// skipped. Pass `reverse = true` to apply the inverse
    /// (reversal/refund), which clamps `spentAmount` at zero rather
    /// than going negative.
    pub async fn update_spending_counters(
        &self,
        request_id: RequestId,
        card: &CardDetails,
        channel: Channel,
        amount: Money,
        timestamp: DateTime<Utc>,
        reverse: bool,
        now: DateTime<Utc>,
    ) -> Result<(), LimitsError> {
        let tier = card.effective_limits().ok_or(LimitsError::NoLimitTier)?;
        let factor = self.config.factor_for(channel);

        let daily = self
            .store
            .get_or_create(
                card.card_id,
                card.account_id,
                WindowType::Daily,
                WindowScope::default(),
                timestamp.date_naive(),
                Money::new(tier.daily_limit.amount() * factor, tier.daily_limit.currency()),
                now,
            )
            .await?;
        self.store.apply_delta(daily.window_id, request_id, amount, reverse, now).await?;

        let monthly = self
            .store
            .get_or_create(
                card.card_id,
                card.account_id,
                WindowType::Monthly,
                WindowScope::default(),
                timestamp.date_naive(),
                tier.monthly_limit,
                now,
            )
            .await?;
        self.store
            .apply_delta(monthly.window_id, request_id, amount, reverse, now)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::InMemorySpendingWindowStore;
    use authz_types::{
        AccountId, CardId, CardStatus, Currency, ExpiryDate, LimitScope, MerchantId, RequestId, TransactionType,
    };
    use rust_decimal_macros::dec;

    fn tier() -> LimitTier {
        LimitTier {
            scope: LimitScope::Default,
            transaction_limit: Money::new(dec!(1000.00), Currency::USD),
            daily_limit: Money::new(dec!(3000.00), Currency::USD),
            monthly_limit: Money::new(dec!(20000.00), Currency::USD),
            atm_daily_limit: Some(Money::new(dec!(500.00), Currency::USD)),
            contactless_limit: Some(Money::new(dec!(100.00), Currency::USD)),
            online_limit: Some(Money::new(dec!(800.00), Currency::USD)),
        }
    }

    fn card() -> CardDetails {
        CardDetails {
            card_id: CardId::new(),
            status: CardStatus::Active,
            expiry: ExpiryDate { month: 1, year: 2099 },
            issuer_country: Some("US".to_string()),
            three_ds_enrollment_status: Some("Y".to_string()),
            account_id: AccountId::new(),
            account_space_id: None,
            account_currency: Currency::USD,
            product_code: Some("GOLD".to_string()),
            limit_tiers: vec![tier()],
        }
    }

    fn request(amount: rust_decimal::Decimal, channel: Channel) -> AuthorizationRequest {
        AuthorizationRequest {
            request_id: RequestId::new(),
            masked_pan: "411111******1111".to_string(),
            pan_hash: Some("hash".to_string()),
            token: None,
            expiry_month: 1,
            expiry_year: 2099,
            merchant_id: MerchantId::new(),
            merchant_name: "Acme".to_string(),
            channel,
            mcc: "5411".to_string(),
            country_code: "US".to_string(),
            transaction_type: TransactionType::Purchase,
            amount: Money::new(amount, Currency::USD),
            cryptogram: None,
            pin_data: None,
            three_ds: None,
            timestamp: Utc::now(),
            processed: false,
            processed_at: None,
        }
    }

    #[tokio::test]
    async fn within_all_limits_passes() {
        let evaluator = LimitEvaluator::new(Arc::new(InMemorySpendingWindowStore::new()), LimitsConfig::default());
        let result = evaluator.check(&request(dec!(50.00), Channel::Pos), &card(), Utc::now()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn exceeds_transaction_limit_is_rejected() {
        let evaluator = LimitEvaluator::new(Arc::new(InMemorySpendingWindowStore::new()), LimitsConfig::default());
        let result = evaluator.check(&request(dec!(5000.00), Channel::Pos), &card(), Utc::now()).await;
        assert!(matches!(result, Err(LimitsError::ExceedsTransactionLimit)));
    }

    #[tokio::test]
    async fn atm_channel_applies_half_factor_then_withdrawal_cap() {
        let evaluator = LimitEvaluator::new(Arc::new(InMemorySpendingWindowStore::new()), LimitsConfig::default());
        // transaction_limit channel-adjusted to 500.00 for ATM; cap itself is also 500.00.
        let result = evaluator.check(&request(dec!(600.00), Channel::Atm), &card(), Utc::now()).await;
        assert!(matches!(result, Err(LimitsError::ExceedsTransactionLimit)));
    }

    #[tokio::test]
    async fn contactless_cap_is_enforced_independently_of_transaction_limit() {
        let evaluator = LimitEvaluator::new(Arc::new(InMemorySpendingWindowStore::new()), LimitsConfig::default());
        let result = evaluator
            .check(&request(dec!(150.00), Channel::Contactless), &card(), Utc::now())
            .await;
        assert!(matches!(result, Err(LimitsError::ExceedsContactlessLimit)));
    }

    #[tokio::test]
    async fn update_spending_counters_is_idempotent_per_request() {
        let evaluator = LimitEvaluator::new(Arc::new(InMemorySpendingWindowStore::new()), LimitsConfig::default());
        let card = card();
        let request_id = RequestId::new();
        let amount = Money::new(dec!(100.00), Currency::USD);
        let now = Utc::now();
        evaluator
            .update_spending_counters(request_id, &card, Channel::Pos, amount, now, false, now)
            .await
            .unwrap();
        evaluator
            .update_spending_counters(request_id, &card, Channel::Pos, amount, now, false, now)
            .await
            .unwrap();
        let snapshot = evaluator.check(&request(dec!(1.00), Channel::Pos), &card, now).await.unwrap();
        assert_eq!(snapshot.daily_window.spent_amount.amount(), dec!(100.00));
    }

    #[tokio::test]
    async fn update_spending_counters_reversal_applies_even_with_the_original_request_id() {
        let evaluator = LimitEvaluator::new(Arc::new(InMemorySpendingWindowStore::new()), LimitsConfig::default());
        let card = card();
        let request_id = RequestId::new();
        let amount = Money::new(dec!(100.00), Currency::USD);
        let now = Utc::now();
        evaluator
            .update_spending_counters(request_id, &card, Channel::Pos, amount, now, false, now)
            .await
            .unwrap();
        evaluator
            .update_spending_counters(request_id, &card, Channel::Pos, amount, now, true, now)
            .await
            .unwrap();
        let snapshot = evaluator.check(&request(dec!(1.00), Channel::Pos), &card, now).await.unwrap();
        assert_eq!(snapshot.daily_window.spent_amount.amount(), dec!(0.00));
    }
}
