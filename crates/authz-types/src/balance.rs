//! The balance snapshot value object returned by the balance checker
//! (C10): available funds before and after a hold, with the FX
//! conversion that was applied, if any.

use crate::{AccountId, Money};
use serde::{Deserialize, Serialize};

/// Present only when the request currency differs from the account's
/// native currency and a conversion was applied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FxConversion {
    pub from_currency: crate::Currency,
    pub to_currency: crate::Currency,
    pub rate: rust_decimal::Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub account_id: AccountId,
    pub ledger_balance: Money,
    pub total_on_hold: Money,
    pub available_before: Money,
    pub available_after: Money,
    pub fx: Option<FxConversion>,
}

impl BalanceSnapshot {
    pub fn sufficient_for(&self, requested: Money) -> bool {
        self.available_before.currency() == requested.currency()
            && self.available_before.amount() >= requested.amount()
    }
}
