//! Card attributes as returned by the card directory (C1) and consumed by
//! the card validator (C7), limit evaluator (C8), and risk engine (C9).
//! The card directory's own internals are an external collaborator; this
//! crate only carries the contract shape.

use crate::{CardId, Currency, Money};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardStatus {
    Active,
    Inactive,
    Expired,
    Lost,
    Stolen,
    Restricted,
}

/// `MM/YY` expiry, compared against "now" by the card validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryDate {
    pub month: u8,
    pub year: u16,
}

impl ExpiryDate {
    /// True iff this expiry is strictly after the given (year, month).
    pub fn is_after(&self, year: i32, month: u32) -> bool {
        (self.year as i32, self.month as u32) > (year, month)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitScope {
    Override,
    CardLevel,
    ProductCode,
    Default,
}

/// One tier of the effective-limit resolution chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitTier {
    pub scope: LimitScope,
    pub transaction_limit: Money,
    pub daily_limit: Money,
    pub monthly_limit: Money,
    pub atm_daily_limit: Option<Money>,
    pub contactless_limit: Option<Money>,
    pub online_limit: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDetails {
    pub card_id: CardId,
    pub status: CardStatus,
    pub expiry: ExpiryDate,
    pub issuer_country: Option<String>,
    pub three_ds_enrollment_status: Option<String>,
    pub account_id: crate::AccountId,
    pub account_space_id: Option<crate::AccountSpaceId>,
    pub account_currency: Currency,
    pub product_code: Option<String>,
    /// Effective-limit candidates, highest-priority first: an active
    /// override (if any), then card-level, then product-code, then the
    /// configured default. The limit evaluator picks the first present.
    pub limit_tiers: Vec<LimitTier>,
}

impl CardDetails {
    pub fn is_three_ds_enrolled(&self) -> bool {
        self.three_ds_enrollment_status.as_deref() == Some("Y")
    }

    /// First-hit-wins resolution: override > card-level > product-code >
    /// default.
    pub fn effective_limits(&self) -> Option<&LimitTier> {
        self.limit_tiers.first()
    }
}
