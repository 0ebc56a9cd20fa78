//! The authorization hold: the money-movement record created when a
//! request is approved, and its state machine through capture, release,
//! or expiry - the same lifecycle shape as an escrow record.

use crate::{AccountId, AccountSpaceId, CardId, Currency, DecisionId, HoldId, MerchantId, Money, RequestId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldStatus {
    Active,
    Captured,
    Released,
    Expired,
}

impl HoldStatus {
    /// Once a hold leaves ACTIVE it never returns - CAPTURED, RELEASED,
    /// and EXPIRED are all sinks.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, HoldStatus::Active)
    }
}

/// The FX conversion applied when the hold's reserved currency differs from
/// the original request currency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HoldFxOrigin {
    pub original_amount: Decimal,
    pub original_currency: Currency,
    pub exchange_rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationHold {
    pub hold_id: HoldId,
    pub request_id: RequestId,
    pub decision_id: DecisionId,
    pub account_id: AccountId,
    pub account_space_id: Option<AccountSpaceId>,
    pub card_id: CardId,
    pub merchant_id: MerchantId,
    pub merchant_name: String,
    /// Immutable once created.
    pub amount: Money,
    pub fx_origin: Option<HoldFxOrigin>,
    pub authorization_code: String,
    pub status: HoldStatus,
    /// Amount actually captured. Always in `[0, amount]`; non-zero iff
    /// `status == Captured`.
    pub captured_amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub captured_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

impl AuthorizationHold {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == HoldStatus::Active && now >= self.expires_at
    }

    /// `capturedAmount > 0 <=> status == CAPTURED`.
    pub fn captured_amount_consistent(&self) -> bool {
        (self.captured_amount.is_positive()) == (self.status == HoldStatus::Captured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Currency;
    use rust_decimal_macros::dec;

    fn sample(status: HoldStatus, captured: Decimal) -> AuthorizationHold {
        let now = Utc::now();
        AuthorizationHold {
            hold_id: HoldId::new(),
            request_id: RequestId::new(),
            decision_id: DecisionId::new(),
            account_id: AccountId::new(),
            account_space_id: None,
            card_id: CardId::new(),
            merchant_id: MerchantId::new(),
            merchant_name: "Acme".to_string(),
            amount: Money::new(dec!(100.00), Currency::USD),
            fx_origin: None,
            authorization_code: "123456".to_string(),
            status,
            captured_amount: Money::new(captured, Currency::USD),
            created_at: now,
            updated_at: now,
            captured_at: None,
            expires_at: now + chrono::Duration::days(7),
        }
    }

    #[test]
    fn captured_amount_must_be_zero_unless_captured() {
        assert!(sample(HoldStatus::Active, dec!(0)).captured_amount_consistent());
        assert!(sample(HoldStatus::Captured, dec!(40)).captured_amount_consistent());
        assert!(!sample(HoldStatus::Active, dec!(40)).captured_amount_consistent());
        assert!(!sample(HoldStatus::Captured, dec!(0)).captured_amount_consistent());
    }

    #[test]
    fn terminal_states_are_sinks() {
        assert!(!HoldStatus::Active.is_terminal());
        assert!(HoldStatus::Captured.is_terminal());
        assert!(HoldStatus::Released.is_terminal());
        assert!(HoldStatus::Expired.is_terminal());
    }
}
