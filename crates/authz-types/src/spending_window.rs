//! Period-scoped spending counters used by the limit evaluator (C8) to
//! enforce daily/monthly limits without re-summing every transaction on
//! each request.

use crate::{AccountId, CardId, Money, SpendingWindowId};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WindowType {
    Daily,
    Monthly,
}

/// Optional narrowing of a window to a single channel/country/MCC, used by
/// channel-specific caps (ATM daily, CONTACTLESS per-txn, E_COMMERCE
/// online). `None` means "all channels/countries/MCCs", i.e. the plain
/// daily/monthly window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowScope {
    pub channel: Option<crate::Channel>,
    pub country_code: Option<String>,
    pub mcc: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingWindow {
    pub window_id: SpendingWindowId,
    pub card_id: CardId,
    pub account_id: AccountId,
    pub window_type: WindowType,
    /// First day the window covers; daily windows span one day, monthly
    /// windows span the calendar month containing this date.
    pub period_start: NaiveDate,
    pub scope: WindowScope,
    pub limit_amount: Money,
    pub spent_amount: Money,
    pub transaction_count: u64,
    pub last_transaction_time: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl SpendingWindow {
    pub fn contains(&self, window_type: WindowType, date: NaiveDate) -> bool {
        if self.window_type != window_type {
            return false;
        }
        match window_type {
            WindowType::Daily => self.period_start == date,
            WindowType::Monthly => {
                self.period_start.year() == date.year() && self.period_start.month() == date.month()
            }
        }
    }

    pub fn remaining_amount(&self) -> Money {
        self.limit_amount.saturating_sub(self.spent_amount)
    }

    /// Record additional spend against this window.
    pub fn increase(&mut self, amount: Money, now: DateTime<Utc>) -> Option<()> {
        self.spent_amount = self.spent_amount.checked_add(amount)?;
        self.transaction_count += 1;
        self.last_transaction_time = Some(now);
        self.updated_at = now;
        Some(())
    }

    /// Reverse previously recorded spend (capture adjustment, refund,
    /// reversal). Clamped at zero: spentAmount never goes negative even
    /// if the reversed amount exceeds what was recorded.
    pub fn decrease(&mut self, amount: Money, now: DateTime<Utc>) {
        self.spent_amount = self.spent_amount.saturating_sub(amount);
        self.updated_at = now;
    }
}

/// Compute the period key a window for `window_type` at `date` belongs to:
/// the date itself for DAILY, the first of the month for MONTHLY. Callers
/// use this to materialize or look up a window lazily on first touch for a
/// period.
pub fn period_start_for(window_type: WindowType, date: NaiveDate) -> NaiveDate {
    match window_type {
        WindowType::Daily => date,
        WindowType::Monthly => date.with_day(1).unwrap_or(date),
    }
}
