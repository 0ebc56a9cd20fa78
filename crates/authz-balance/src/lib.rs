//! Balance Checker (C10): consults the ledger for an account's
//! available funds, converts the requested amount into the account's
//! settlement currency if needed, and fails the request outright with
//! `INSUFFICIENT_FUNDS` if the converted amount exceeds what's available.
//! The check is unconditional: there is no partial-approval path here,
//! so this crate never produces a partial amount.

pub mod error;

pub use error::BalanceError;

use authz_fx::Fx;
use authz_ledger::Ledger;
use authz_types::{AccountId, BalanceSnapshot, Currency, FxConversion, Money};
use rust_decimal::Decimal;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct BalanceOutcome {
    pub snapshot: BalanceSnapshot,
    /// The full requested amount, in `requested`'s currency. Always
    /// equal to what was asked for - `check` errors rather than return
    /// a lesser amount.
    pub approved_amount: Money,
    /// The same amount, in the account's settlement currency - what the
    /// hold manager actually reserves at the ledger, against
    /// `(accountId, accountSpaceId, currency)`, which is always the
    /// account's own currency, not the request's.
    pub approved_amount_account_currency: Money,
}

pub struct BalanceChecker {
    ledger: Arc<dyn Ledger>,
    fx: Arc<dyn Fx>,
}

impl BalanceChecker {
    pub fn new(ledger: Arc<dyn Ledger>, fx: Arc<dyn Fx>) -> Self {
        Self { ledger, fx }
    }

    pub async fn check(
        &self,
        account_id: AccountId,
        account_currency: Currency,
        requested: Money,
    ) -> Result<BalanceOutcome, BalanceError> {
        let balances = self.ledger.balances(account_id).await?;
        let available = balances.available();

        let (converted_requested, fx) = if requested.currency() != account_currency {
            let rate = self.fx.rate(requested.currency(), account_currency).await?;
            let fx = FxConversion {
                from_currency: requested.currency(),
                to_currency: account_currency,
                rate,
            };
            (requested.convert(rate, account_currency), Some(fx))
        } else {
            (requested, None)
        };

        if converted_requested.amount() > available.amount() {
            return Err(BalanceError::InsufficientFunds {
                available: available.amount(),
                required: converted_requested.amount(),
            });
        }

        let approved_in_account_currency = converted_requested;

        let approved_amount = match fx {
            Some(conv) => approved_in_account_currency.convert(Decimal::ONE / conv.rate, requested.currency()),
            None => approved_in_account_currency,
        };

        let available_after = available.saturating_sub(approved_in_account_currency);

        let snapshot = BalanceSnapshot {
            account_id,
            ledger_balance: balances.ledger_balance,
            total_on_hold: balances.reserved,
            available_before: available,
            available_after,
            fx,
        };

        Ok(BalanceOutcome {
            snapshot,
            approved_amount,
            approved_amount_account_currency: approved_in_account_currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authz_fx::mock::StaticFxProvider;
    use authz_ledger::InMemoryLedger;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn sufficient_same_currency_balance_approves_in_full() {
        let ledger = Arc::new(InMemoryLedger::new());
        let account_id = AccountId::new();
        ledger.seed(account_id, Money::new(dec!(500.00), Currency::USD)).await;
        let checker = BalanceChecker::new(ledger, Arc::new(StaticFxProvider::new()));

        let outcome = checker
            .check(account_id, Currency::USD, Money::new(dec!(100.00), Currency::USD))
            .await
            .unwrap();
        assert_eq!(outcome.approved_amount.amount(), dec!(100.00));
    }

    #[tokio::test]
    async fn balance_short_of_the_requested_amount_declines_outright() {
        let ledger = Arc::new(InMemoryLedger::new());
        let account_id = AccountId::new();
        ledger.seed(account_id, Money::new(dec!(40.00), Currency::USD)).await;
        let checker = BalanceChecker::new(ledger, Arc::new(StaticFxProvider::new()));

        let requested = Money::new(dec!(100.00), Currency::USD);
        let result = checker.check(account_id, Currency::USD, requested).await;
        assert!(matches!(
            result,
            Err(BalanceError::InsufficientFunds { available, required })
                if available == dec!(40.00) && required == dec!(100.00)
        ));
    }

    #[tokio::test]
    async fn zero_balance_is_a_hard_decline() {
        let ledger = Arc::new(InMemoryLedger::new());
        let account_id = AccountId::new();
        ledger.seed(account_id, Money::zero(Currency::USD)).await;
        let checker = BalanceChecker::new(ledger, Arc::new(StaticFxProvider::new()));

        let result = checker.check(account_id, Currency::USD, Money::new(dec!(10.00), Currency::USD)).await;
        assert!(matches!(result, Err(BalanceError::InsufficientFunds { .. })));
    }

    #[tokio::test]
    async fn cross_currency_request_is_converted_before_comparison() {
        let ledger = Arc::new(InMemoryLedger::new());
        let account_id = AccountId::new();
        ledger.seed(account_id, Money::new(dec!(200.00), Currency::USD)).await;
        let fx = StaticFxProvider::new();
        fx.set_rate(Currency::EUR, Currency::USD, dec!(1.10));
        let checker = BalanceChecker::new(ledger, Arc::new(fx));

        let requested = Money::new(dec!(100.00), Currency::EUR);
        let outcome = checker.check(account_id, Currency::USD, requested).await.unwrap();
        assert!(outcome.snapshot.fx.is_some());
        assert_eq!(outcome.approved_amount.amount(), dec!(100.00));
    }
}
